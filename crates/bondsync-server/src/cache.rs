//! Hash-addressed snapshot cache.
//!
//! One file per document hash, `<dir>/<hash>.msgpack`, holding the
//! MessagePack-encoded snapshot. Entries are written once at startup and
//! never updated, so there is no locking between writers.

use bondsync_common::protocol::error::Result;
use bondsync_common::transport::MsgPackCodec;
use bondsync_common::Snapshot;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

const CACHE_EXTENSION: &str = "msgpack";

pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the cache file for `hash`.
    ///
    /// Hashes are URL-safe base64, so they are always valid file names.
    pub fn path_for(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", hash, CACHE_EXTENSION))
    }

    /// Loads the cached snapshot for `hash`.
    ///
    /// # Returns
    /// - `Ok(Some(snapshot))` - Cache hit
    /// - `Ok(None)` - The directory or the file does not exist
    /// - `Err(BondsyncError)` - The file exists but could not be read or decoded
    pub async fn load(&self, hash: &str) -> Result<Option<Snapshot>> {
        let path = self.path_for(hash);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache miss for {}", hash);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot = MsgPackCodec::decode_snapshot(&bytes)?;
        info!("Loaded {} from cache ({} bytes)", hash, bytes.len());
        Ok(Some(snapshot))
    }

    /// Writes the snapshot for `hash`, creating the directory if needed.
    pub async fn store(&self, hash: &str, snapshot: &Snapshot) -> Result<()> {
        let bytes = MsgPackCodec::encode_snapshot(snapshot)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(hash), &bytes).await?;
        info!("Stored {} in cache ({} bytes)", hash, bytes.len());
        Ok(())
    }
}
