//! Document-level value types
//!
//! The server never looks inside a snapshot beyond two named sections: the
//! per-cell results and the bond values. Everything else is opaque.

use std::collections::{BTreeMap, BTreeSet};

/// Full serialized state of a document, as produced by the execution engine.
///
/// Map key order is preserved, so two snapshots from the same engine diff in
/// a stable order.
pub type Snapshot = serde_json::Value;

/// Identifier of a computation cell.
pub type CellId = String;

/// New values for a set of bonds, keyed by bond name.
pub type BondValues = serde_json::Map<String, serde_json::Value>;

/// For every bond, the set of other bonds it transitively affects.
pub type BondConnections = BTreeMap<String, BTreeSet<String>>;
