use bondsync_common::protocol::error::{BondsyncError, Result};
use bondsync_common::document_hash;
use std::path::{Path, PathBuf};

/// A document source file and its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub source: String,
    pub hash: String,
}

impl Document {
    /// Wraps source text that is already in memory.
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let source = source.into();
        let hash = document_hash(source.as_bytes());
        Self {
            path: path.into(),
            source,
            hash,
        }
    }

    /// Reads a document from disk and hashes its raw bytes.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let source = String::from_utf8(bytes).map_err(|_| {
            BondsyncError::InvalidRequest(format!("{} is not valid UTF-8", path.display()))
        })?;
        Ok(Self::new(path, source))
    }
}
