use bondsync_common::{CellId, Snapshot};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Names of the two snapshot sections the server understands.
///
/// Everything else in a snapshot is opaque and never reaches a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLayout {
    /// Section mapping cell id to that cell's result
    ///
    /// Default: `cell_results`
    pub cells_key: String,
    /// Section mapping bond name to its current value
    ///
    /// Default: `bonds`
    pub bonds_key: String,
}

impl Default for SnapshotLayout {
    fn default() -> Self {
        Self {
            cells_key: "cell_results".to_string(),
            bonds_key: "bonds".to_string(),
        }
    }
}

impl SnapshotLayout {
    pub fn new(cells_key: impl Into<String>, bonds_key: impl Into<String>) -> Self {
        Self {
            cells_key: cells_key.into(),
            bonds_key: bonds_key.into(),
        }
    }

    /// Projects a snapshot down to what one bond update may broadcast.
    ///
    /// Keeps the results of the cells in `ran` (in `ran` order) and empties
    /// the bond section: bond values belong to the viewer that set them and
    /// are never sent to other viewers.
    pub fn relevant(&self, snapshot: &Snapshot, ran: &[CellId]) -> Snapshot {
        let cells = snapshot.get(&self.cells_key).and_then(Value::as_object);

        let mut kept = Map::new();
        if let Some(cells) = cells {
            for id in ran {
                if let Some(result) = cells.get(id) {
                    kept.insert(id.clone(), result.clone());
                }
            }
        }

        let mut projected = Map::new();
        projected.insert(self.cells_key.clone(), Value::Object(kept));
        projected.insert(self.bonds_key.clone(), Value::Object(Map::new()));
        Value::Object(projected)
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    ///
    /// Default: 127.0.0.1:2345
    pub bind: SocketAddr,
    /// Directory holding one cached snapshot per document hash
    ///
    /// `None` disables the cache entirely.
    pub cache_dir: Option<PathBuf>,
    /// Directory of a previous static export, served for unmatched GETs
    pub static_dir: Option<PathBuf>,
    /// Keep engine instances alive and answer bond updates
    ///
    /// When false every document ends `Finished` and cached snapshots are
    /// used instead of running the engine.
    /// Default: true
    pub keep_running: bool,
    /// Write freshly computed snapshots to the cache directory
    ///
    /// Default: true
    pub store_cache: bool,
    /// Artificial delay added to every bond update after the session lock
    /// is taken
    ///
    /// Default: zero
    pub simulated_lag: Duration,
    pub layout: SnapshotLayout,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 2345)),
            cache_dir: None,
            static_dir: None,
            keep_running: true,
            store_cache: true,
            simulated_lag: Duration::ZERO,
            layout: SnapshotLayout::default(),
        }
    }
}

impl ServerConfig {
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn with_keep_running(mut self, keep_running: bool) -> Self {
        self.keep_running = keep_running;
        self
    }

    pub fn with_store_cache(mut self, store_cache: bool) -> Self {
        self.store_cache = store_cache;
        self
    }

    pub fn with_simulated_lag(mut self, lag: Duration) -> Self {
        self.simulated_lag = lag;
        self
    }

    pub fn with_layout(mut self, layout: SnapshotLayout) -> Self {
        self.layout = layout;
        self
    }
}
