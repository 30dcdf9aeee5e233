//! Patch operations and the state response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::document::CellId;

/// One step of a path into a nested document.
///
/// Serialized untagged, so a path reads as `["cell_results", "c1", 0]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(index) => write!(f, "{}", index),
            PathSegment::Key(key) => f.write_str(key),
        }
    }
}

/// A single edit in a patch.
///
/// Encoded as `{"op": "add" | "remove" | "replace", "path": [...], "value": ...}`,
/// with `value` absent for removals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: Vec<PathSegment>, value: Value },
    Remove { path: Vec<PathSegment> },
    Replace { path: Vec<PathSegment>, value: Value },
}

impl PatchOp {
    pub fn path(&self) -> &[PathSegment] {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Remove { path } | PatchOp::Replace { path, .. } => {
                path
            }
        }
    }
}

/// Renders a path as `a/b/0` for log lines and error messages.
pub fn display_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|segment| segment.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Body of a successful state request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateResponse {
    pub patches: Vec<PatchOp>,
    pub ids_of_cells_that_ran: Vec<CellId>,
}
