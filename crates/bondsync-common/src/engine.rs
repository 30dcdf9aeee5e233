//! The execution engine contract.
//!
//! The server never runs documents itself. It drives an external engine
//! through [`Engine`], one call per handle at a time: the server serializes
//! calls for a handle with that session's lock, so implementations may assume
//! no concurrent calls for the same handle. Calls for different handles can
//! arrive concurrently.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::protocol::document::{BondConnections, BondValues, CellId, Snapshot};
use crate::protocol::error::Result;

/// Opaque identifier the engine uses for one live document instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineHandle(pub String);

impl fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of opening and fully running a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenedDocument {
    pub handle: EngineHandle,
    pub snapshot: Snapshot,
}

#[async_trait]
pub trait Engine: Send + Sync {
    /// Opens the document and runs it to completion.
    async fn open_and_run(&self, path: &Path, source: &str) -> Result<OpenedDocument>;

    /// Writes `bonds` into the live input state and re-runs the affected cells.
    ///
    /// Resolves once the re-run has finished, with the ids of the cells that
    /// ran in execution order.
    async fn rerun(
        &self,
        handle: &EngineHandle,
        bonds: &BondValues,
        is_first_value: bool,
    ) -> Result<Vec<CellId>>;

    /// Current full snapshot of a live document.
    async fn snapshot(&self, handle: &EngineHandle) -> Result<Snapshot>;

    /// Which bonds each bond transitively affects.
    async fn bond_connections(&self, handle: &EngineHandle) -> Result<BondConnections>;

    /// Releases the live document instance.
    async fn shutdown(&self, handle: &EngineHandle) -> Result<()>;
}
