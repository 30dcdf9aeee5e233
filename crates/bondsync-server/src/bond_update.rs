//! Bond updates: apply new input values to a running document and answer
//! with the patch that brings a viewer's copy up to date.

use bondsync_common::diff::diff;
use bondsync_common::protocol::error::{BondsyncError, Result};
use bondsync_common::transport::MsgPackCodec;
use bondsync_common::{BondConnections, BondValues, CellId, Engine, Snapshot, StateResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use crate::config::SnapshotLayout;
use crate::session::{NotebookSession, RunningSession, SessionRegistry};

/// Request body of a bond update, as it arrived.
#[derive(Debug, Clone, Copy)]
pub enum BondPayload<'a> {
    /// MessagePack body of a POST
    Binary(&'a [u8]),
    /// URL-safe base64 of the MessagePack body, from a GET path segment
    Base64(&'a str),
}

impl BondPayload<'_> {
    pub fn decode(&self) -> Result<BondValues> {
        match self {
            BondPayload::Binary(bytes) => MsgPackCodec::decode_bonds(bytes),
            BondPayload::Base64(segment) => {
                MsgPackCodec::decode_bonds(&MsgPackCodec::decode_url_segment(segment)?)
            }
        }
    }
}

pub struct BondUpdateHandler {
    registry: Arc<SessionRegistry>,
    engine: Arc<dyn Engine>,
    layout: SnapshotLayout,
    simulated_lag: Duration,
}

impl BondUpdateHandler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        engine: Arc<dyn Engine>,
        layout: SnapshotLayout,
    ) -> Self {
        Self {
            registry,
            engine,
            layout,
            simulated_lag: Duration::ZERO,
        }
    }

    pub fn with_simulated_lag(mut self, lag: Duration) -> Self {
        self.simulated_lag = lag;
        self
    }

    /// Finds the running session for `hash`.
    ///
    /// # Errors
    /// - `NotFound` - No document has this hash, or its session is finished
    /// - `StillLoading` - The session is still queued
    pub async fn resolve(&self, hash: &str) -> Result<Arc<RunningSession>> {
        match self.registry.get(hash).await {
            None => Err(BondsyncError::NotFound(hash.to_string())),
            Some(NotebookSession::Queued { hash }) => Err(BondsyncError::StillLoading(hash)),
            Some(NotebookSession::Finished { hash, .. }) => Err(BondsyncError::NotFound(format!(
                "{} is no longer running",
                hash
            ))),
            Some(NotebookSession::Running(session)) => Ok(session),
        }
    }

    /// Applies a bond update and returns the patch for the cells that ran.
    ///
    /// Updates for one document are handled one at a time in arrival order
    /// of the session lock; updates for different documents run in parallel.
    /// The baseline only advances when the engine succeeded, so a failed
    /// update leaves the session exactly as it was.
    ///
    /// Once the lock is taken, the engine calls run on their own task. If the
    /// request is dropped, the update still finishes before the next one for
    /// this document starts.
    pub async fn handle(&self, hash: &str, payload: BondPayload<'_>) -> Result<StateResponse> {
        let session = self.resolve(hash).await?;
        let baseline = session.lock().await;

        let bonds = payload.decode()?;
        debug!(
            "Bond update for {}: {:?}",
            hash,
            bonds.keys().collect::<Vec<_>>()
        );

        let update = tokio::spawn(apply_update(
            self.engine.clone(),
            session,
            baseline,
            bonds,
            self.layout.clone(),
            self.simulated_lag,
        ));
        let (ran, before, after) = update
            .await
            .map_err(|e| BondsyncError::Engine(format!("bond update for {} aborted: {}", hash, e)))??;

        let patches = diff(&before, &after);
        debug!(
            "{}: {} cells ran, {} patches",
            hash,
            ran.len(),
            patches.len()
        );

        Ok(StateResponse {
            patches,
            ids_of_cells_that_ran: ran,
        })
    }

    /// Bond dependency graph of a running document.
    pub async fn bond_connections(&self, hash: &str) -> Result<BondConnections> {
        let session = self.resolve(hash).await?;
        Ok(session.bond_connections.clone())
    }
}

/// Re-runs the document and advances the baseline, holding the session lock
/// throughout.
///
/// Returns the cells that ran with the old and new state of just those cells.
async fn apply_update(
    engine: Arc<dyn Engine>,
    session: Arc<RunningSession>,
    mut baseline: OwnedMutexGuard<Snapshot>,
    bonds: BondValues,
    layout: SnapshotLayout,
    simulated_lag: Duration,
) -> Result<(Vec<CellId>, Snapshot, Snapshot)> {
    if !simulated_lag.is_zero() {
        tokio::time::sleep(simulated_lag).await;
    }

    let ran = engine
        .rerun(&session.handle, &bonds, false)
        .await
        .map_err(|e| engine_failure(&session.hash, e))?;
    let fresh = engine
        .snapshot(&session.handle)
        .await
        .map_err(|e| engine_failure(&session.hash, e))?;

    let before = layout.relevant(&baseline, &ran);
    let after = layout.relevant(&fresh, &ran);
    *baseline = fresh;

    Ok((ran, before, after))
}

fn engine_failure(hash: &str, error: BondsyncError) -> BondsyncError {
    warn!("Engine failed on {}: {}", hash, error);
    match error {
        BondsyncError::Engine(_) => error,
        other => BondsyncError::Engine(other.to_string()),
    }
}
