//! In-process engine used by the integration tests.
//!
//! A document's source is its initial snapshot, as JSON, with a `cells`
//! section and a `bonds` section. A rerun writes the new bond values into
//! `bonds`, then asks the test's cell rule which cells run and what they
//! produce.

#![allow(dead_code)]

use async_trait::async_trait;
use bondsync_common::{
    BondConnections, BondValues, BondsyncError, CellId, Engine, EngineHandle, OpenedDocument,
    Result, Snapshot,
};
use bondsync_server::{Document, ServerConfig, SnapshotLayout};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Given every bond value after the update, the cells that run and their
/// new results, in execution order.
pub type CellRule = dyn Fn(&BondValues) -> Vec<(CellId, Value)> + Send + Sync;

pub struct FakeEngine {
    rule: Box<CellRule>,
    rerun_delay: Duration,
    open_delay: Duration,
    instances: Mutex<HashMap<EngineHandle, Snapshot>>,
    next_handle: AtomicUsize,
    pub opens: AtomicUsize,
    pub reruns: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub fail_next_snapshot: AtomicBool,
    active: Mutex<HashMap<EngineHandle, usize>>,
    active_total: AtomicUsize,
    pub max_active_per_handle: AtomicUsize,
    pub max_active_total: AtomicUsize,
}

impl FakeEngine {
    pub fn new(rule: impl Fn(&BondValues) -> Vec<(CellId, Value)> + Send + Sync + 'static) -> Self {
        Self {
            rule: Box::new(rule),
            rerun_delay: Duration::ZERO,
            open_delay: Duration::ZERO,
            instances: Mutex::new(HashMap::new()),
            next_handle: AtomicUsize::new(1),
            opens: AtomicUsize::new(0),
            reruns: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            fail_next_snapshot: AtomicBool::new(false),
            active: Mutex::new(HashMap::new()),
            active_total: AtomicUsize::new(0),
            max_active_per_handle: AtomicUsize::new(0),
            max_active_total: AtomicUsize::new(0),
        }
    }

    /// `c1` becomes `x - 3` whenever `x` is set; nothing else runs.
    pub fn scenario() -> Self {
        Self::new(|bonds| match bonds.get("x").and_then(Value::as_i64) {
            Some(x) => vec![("c1".to_string(), json!(x - 3))],
            None => vec![],
        })
    }

    /// `total` is the sum of every numeric bond.
    pub fn summing() -> Self {
        Self::new(|bonds| {
            let total: i64 = bonds.values().filter_map(Value::as_i64).sum();
            vec![("total".to_string(), json!(total))]
        })
    }

    pub fn with_rerun_delay(mut self, delay: Duration) -> Self {
        self.rerun_delay = delay;
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn live_instances(&self) -> usize {
        self.instances.lock().unwrap().len()
    }

    fn enter(&self, handle: &EngineHandle) {
        let mut active = self.active.lock().unwrap();
        let count = active.entry(handle.clone()).or_insert(0);
        *count += 1;
        self.max_active_per_handle.fetch_max(*count, Ordering::SeqCst);
        let total = self.active_total.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_total.fetch_max(total, Ordering::SeqCst);
    }

    fn leave(&self, handle: &EngineHandle) {
        if let Some(count) = self.active.lock().unwrap().get_mut(handle) {
            *count -= 1;
        }
        self.active_total.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn open_and_run(&self, _path: &Path, source: &str) -> Result<OpenedDocument> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.open_delay).await;
        let snapshot: Snapshot = serde_json::from_str(source)
            .map_err(|e| BondsyncError::Engine(format!("syntax error: {}", e)))?;

        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        let handle = EngineHandle(format!("engine-{}", id));
        self.instances
            .lock()
            .unwrap()
            .insert(handle.clone(), snapshot.clone());

        Ok(OpenedDocument { handle, snapshot })
    }

    async fn rerun(
        &self,
        handle: &EngineHandle,
        bonds: &BondValues,
        _is_first_value: bool,
    ) -> Result<Vec<CellId>> {
        self.reruns.fetch_add(1, Ordering::SeqCst);
        if bonds.contains_key("explode") {
            return Err(BondsyncError::Engine("cell threw an exception".into()));
        }

        self.enter(handle);
        tokio::time::sleep(self.rerun_delay).await;

        let result = {
            let mut instances = self.instances.lock().unwrap();
            match instances.get_mut(handle) {
                Some(snapshot) => {
                    for (name, value) in bonds {
                        snapshot["bonds"][name.as_str()] = value.clone();
                    }
                    let all_bonds = snapshot["bonds"].as_object().cloned().unwrap_or_default();

                    let mut ran = Vec::new();
                    for (cell, value) in (self.rule)(&all_bonds) {
                        snapshot["cells"][cell.as_str()] = value;
                        ran.push(cell);
                    }
                    Ok(ran)
                }
                None => Err(BondsyncError::Engine(format!("unknown handle {}", handle))),
            }
        };

        self.leave(handle);
        result
    }

    async fn snapshot(&self, handle: &EngineHandle) -> Result<Snapshot> {
        if self.fail_next_snapshot.swap(false, Ordering::SeqCst) {
            return Err(BondsyncError::Transport("connection reset".into()));
        }
        self.instances
            .lock()
            .unwrap()
            .get(handle)
            .cloned()
            .ok_or_else(|| BondsyncError::Engine(format!("unknown handle {}", handle)))
    }

    async fn bond_connections(&self, handle: &EngineHandle) -> Result<BondConnections> {
        let instances = self.instances.lock().unwrap();
        let snapshot = instances
            .get(handle)
            .ok_or_else(|| BondsyncError::Engine(format!("unknown handle {}", handle)))?;

        // Every bond affects every bond of its document
        let names: BTreeSet<String> = snapshot["bonds"]
            .as_object()
            .map(|bonds| bonds.keys().cloned().collect())
            .unwrap_or_default();
        Ok(names
            .iter()
            .map(|name| (name.clone(), names.clone()))
            .collect())
    }

    async fn shutdown(&self, handle: &EngineHandle) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.instances.lock().unwrap().remove(handle);
        Ok(())
    }
}

/// Document whose source is the given initial snapshot.
pub fn document(name: &str, snapshot: Value) -> Document {
    Document::new(format!("{}.jl", name), snapshot.to_string())
}

/// Live-session config with the `cells` / `bonds` layout the fake engine uses.
pub fn live_config() -> ServerConfig {
    ServerConfig::default().with_layout(SnapshotLayout::new("cells", "bonds"))
}
