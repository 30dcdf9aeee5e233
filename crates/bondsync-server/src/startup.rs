//! Startup driver: moves every queued session to its final state.
//!
//! Documents are processed one at a time, in registry order. Each one is
//! either loaded from the cache (only when sessions are not kept running)
//! or opened in the engine, then kept alive or shut down.

use bondsync_common::protocol::error::Result;
use bondsync_common::{Engine, Snapshot};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::cache::CacheStore;
use crate::config::ServerConfig;
use crate::document::Document;
use crate::session::{NotebookSession, RunningSession, SessionRegistry};

/// What happened to each document during startup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StartupReport {
    pub loaded_from_cache: usize,
    pub ran: usize,
    /// Hashes of documents that stayed queued because startup failed
    pub failed: Vec<String>,
}

enum Outcome {
    Cached,
    Ran,
}

pub struct StartupDriver {
    registry: Arc<SessionRegistry>,
    engine: Arc<dyn Engine>,
    cache: Option<CacheStore>,
    keep_running: bool,
    store_cache: bool,
}

impl StartupDriver {
    pub fn new(
        registry: Arc<SessionRegistry>,
        engine: Arc<dyn Engine>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            registry,
            engine,
            cache: config.cache_dir.clone().map(CacheStore::new),
            keep_running: config.keep_running,
            store_cache: config.store_cache,
        }
    }

    /// Transitions the slot of every document, in order.
    ///
    /// `documents[i]` must be the document of registry slot `i`. A document
    /// that fails is logged and left queued; the remaining documents still
    /// start.
    pub async fn run(&self, documents: &[Document]) -> StartupReport {
        let (_stop_tx, stop_rx) = watch::channel(false);
        self.run_until_stopped(documents, stop_rx).await
    }

    /// Like [`run`](Self::run), but checks `stop` before each document.
    ///
    /// Once `stop` is true, the document in flight still completes its
    /// transition so its engine instance is tracked, and the rest stay queued.
    pub async fn run_until_stopped(
        &self,
        documents: &[Document],
        stop: watch::Receiver<bool>,
    ) -> StartupReport {
        let mut report = StartupReport::default();

        for (index, document) in documents.iter().enumerate() {
            if *stop.borrow() {
                info!(
                    "Startup stopped, {} documents left queued",
                    documents.len() - index
                );
                break;
            }
            info!(
                "[{}/{}] Starting {}",
                index + 1,
                documents.len(),
                document.path.display()
            );

            match self.start_one(index, document).await {
                Ok(Outcome::Cached) => report.loaded_from_cache += 1,
                Ok(Outcome::Ran) => report.ran += 1,
                Err(e) => {
                    error!("Failed to start {}: {}", document.path.display(), e);
                    report.failed.push(document.hash.clone());
                }
            }
        }

        info!(
            "Startup complete: {} from cache, {} ran, {} failed",
            report.loaded_from_cache,
            report.ran,
            report.failed.len()
        );
        report
    }

    async fn start_one(&self, index: usize, document: &Document) -> Result<Outcome> {
        if !self.keep_running {
            if let Some(snapshot) = self.load_cached(&document.hash).await {
                self.registry
                    .transition(
                        index,
                        NotebookSession::Finished {
                            hash: document.hash.clone(),
                            snapshot: Arc::new(snapshot),
                        },
                    )
                    .await?;
                return Ok(Outcome::Cached);
            }
        }

        let opened = self
            .engine
            .open_and_run(&document.path, &document.source)
            .await?;

        if self.store_cache {
            if let Some(cache) = &self.cache {
                if let Err(e) = cache.store(&document.hash, &opened.snapshot).await {
                    warn!("Could not cache {}: {}", document.hash, e);
                }
            }
        }

        let session = if self.keep_running {
            let bond_connections = match self.engine.bond_connections(&opened.handle).await {
                Ok(connections) => connections,
                Err(e) => {
                    if let Err(shutdown_err) = self.engine.shutdown(&opened.handle).await {
                        warn!("Could not shut down {}: {}", opened.handle, shutdown_err);
                    }
                    return Err(e);
                }
            };

            NotebookSession::Running(Arc::new(RunningSession::new(
                document.hash.clone(),
                document.path.clone(),
                opened.handle,
                bond_connections,
                opened.snapshot,
            )))
        } else {
            if let Err(e) = self.engine.shutdown(&opened.handle).await {
                warn!("Could not shut down {}: {}", opened.handle, e);
            }
            NotebookSession::Finished {
                hash: document.hash.clone(),
                snapshot: Arc::new(opened.snapshot),
            }
        };

        self.registry.transition(index, session).await?;
        Ok(Outcome::Ran)
    }

    /// Cache lookup; unreadable entries count as misses.
    async fn load_cached(&self, hash: &str) -> Option<Snapshot> {
        let cache = self.cache.as_ref()?;
        match cache.load(hash).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Ignoring unreadable cache entry for {}: {}", hash, e);
                None
            }
        }
    }
}

/// Shuts down the engine instance of every running session.
///
/// Returns how many instances were shut down cleanly.
pub async fn shutdown_running(registry: &SessionRegistry, engine: &dyn Engine) -> usize {
    let mut stopped = 0;
    for session in registry.running().await {
        // Wait for any update in flight
        let _guard = session.lock().await;
        match engine.shutdown(&session.handle).await {
            Ok(()) => stopped += 1,
            Err(e) => warn!("Could not shut down {}: {}", session.hash, e),
        }
    }
    info!("Shut down {} running sessions", stopped);
    stopped
}
