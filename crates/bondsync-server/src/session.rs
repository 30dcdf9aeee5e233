//! Notebook sessions and the registry that holds them.
//!
//! The registry is a fixed arena: one slot per document, created `Queued`
//! and replaced exactly once by the startup driver. After that, the HTTP
//! layer only ever reads slots, taking a short read lock to clone the
//! session out.

use bondsync_common::protocol::error::{BondsyncError, Result};
use bondsync_common::{BondConnections, EngineHandle, Snapshot};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// A document kept alive in the engine.
///
/// The baseline is the last snapshot sent to viewers. Holding its lock is
/// what serializes bond updates for this document. The guard is owned, so it
/// can move into a task that outlives the request that acquired it.
pub struct RunningSession {
    pub hash: String,
    pub path: PathBuf,
    pub handle: EngineHandle,
    pub bond_connections: BondConnections,
    baseline: Arc<Mutex<Snapshot>>,
}

impl RunningSession {
    pub fn new(
        hash: impl Into<String>,
        path: impl Into<PathBuf>,
        handle: EngineHandle,
        bond_connections: BondConnections,
        snapshot: Snapshot,
    ) -> Self {
        Self {
            hash: hash.into(),
            path: path.into(),
            handle,
            bond_connections,
            baseline: Arc::new(Mutex::new(snapshot)),
        }
    }

    /// Waits for exclusive access to the session.
    pub async fn lock(&self) -> OwnedMutexGuard<Snapshot> {
        self.baseline.clone().lock_owned().await
    }
}

impl fmt::Debug for RunningSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningSession")
            .field("hash", &self.hash)
            .field("path", &self.path)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum NotebookSession {
    /// Waiting for the startup driver; no engine instance yet.
    Queued { hash: String },
    Running(Arc<RunningSession>),
    /// Engine instance released; the snapshot is frozen.
    Finished { hash: String, snapshot: Arc<Snapshot> },
}

/// Tag of a session's state, for logs and introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Queued,
    Running,
    Finished,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Queued => "queued",
            SessionState::Running => "running",
            SessionState::Finished => "finished",
        };
        f.write_str(name)
    }
}

impl NotebookSession {
    pub fn hash(&self) -> &str {
        match self {
            NotebookSession::Queued { hash } => hash,
            NotebookSession::Running(running) => &running.hash,
            NotebookSession::Finished { hash, .. } => hash,
        }
    }

    pub fn state(&self) -> SessionState {
        match self {
            NotebookSession::Queued { .. } => SessionState::Queued,
            NotebookSession::Running(_) => SessionState::Running,
            NotebookSession::Finished { .. } => SessionState::Finished,
        }
    }
}

/// One slot per document, addressed by position or by hash.
pub struct SessionRegistry {
    slots: Vec<RwLock<NotebookSession>>,
    index: HashMap<String, usize>,
}

impl SessionRegistry {
    /// Creates a registry with one `Queued` slot per hash, in order.
    ///
    /// # Errors
    /// `InvalidRequest` if a hash appears twice: two documents with the same
    /// source would be indistinguishable in URLs and cache files.
    pub fn new(hashes: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut slots = Vec::new();
        let mut index = HashMap::new();

        for hash in hashes {
            if index.insert(hash.clone(), slots.len()).is_some() {
                return Err(BondsyncError::InvalidRequest(format!(
                    "duplicate document hash {}",
                    hash
                )));
            }
            slots.push(RwLock::new(NotebookSession::Queued { hash }));
        }

        Ok(Self { slots, index })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn index_of(&self, hash: &str) -> Option<usize> {
        self.index.get(hash).copied()
    }

    /// Current session for `hash`, or `None` if no document has that hash.
    pub async fn get(&self, hash: &str) -> Option<NotebookSession> {
        let index = self.index_of(hash)?;
        Some(self.slots[index].read().await.clone())
    }

    /// Replaces a `Queued` slot with its final state.
    ///
    /// # Errors
    /// `InvalidTransition` if the slot does not exist, was already
    /// transitioned, belongs to another hash, or `session` is `Queued`.
    pub async fn transition(&self, index: usize, session: NotebookSession) -> Result<()> {
        let slot = self.slots.get(index).ok_or_else(|| {
            BondsyncError::InvalidTransition(format!("no slot at index {}", index))
        })?;

        let mut current = slot.write().await;
        match &*current {
            NotebookSession::Queued { hash } if hash == session.hash() => {}
            NotebookSession::Queued { hash } => {
                return Err(BondsyncError::InvalidTransition(format!(
                    "slot {} holds {}, not {}",
                    index,
                    hash,
                    session.hash()
                )));
            }
            other => {
                return Err(BondsyncError::InvalidTransition(format!(
                    "{} is already {}",
                    other.hash(),
                    other.state()
                )));
            }
        }

        if session.state() == SessionState::Queued {
            return Err(BondsyncError::InvalidTransition(format!(
                "{} cannot go back to queued",
                session.hash()
            )));
        }

        tracing::info!("Session {} is now {}", session.hash(), session.state());
        *current = session;
        Ok(())
    }

    /// True when every session is `Running`.
    pub async fn is_ready(&self) -> bool {
        for slot in &self.slots {
            if slot.read().await.state() != SessionState::Running {
                return false;
            }
        }
        true
    }

    /// Hash and state of every slot, in document order.
    pub async fn summary(&self) -> Vec<(String, SessionState)> {
        let mut summary = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let session = slot.read().await;
            summary.push((session.hash().to_string(), session.state()));
        }
        summary
    }

    /// All currently running sessions.
    pub async fn running(&self) -> Vec<Arc<RunningSession>> {
        let mut running = Vec::new();
        for slot in &self.slots {
            if let NotebookSession::Running(session) = &*slot.read().await {
                running.push(session.clone());
            }
        }
        running
    }
}
