//! bondsync common types
//!
//! Shared infrastructure for the bondsync live-document server:
//!
//! - **Protocol Layer**: document snapshots, bond values, patch operations,
//!   the state response envelope and the error taxonomy
//! - **Transport Layer**: the MessagePack wire codec and JSON-RPC helpers used
//!   to reach an external execution engine
//! - **Diff Engine**: a generic structural differ producing ordered patches
//! - **Engine Contract**: the trait the server drives the execution engine through
//!
//! # Wire format
//!
//! Every binary payload exchanged with viewers is MessagePack, with structs
//! encoded as maps keyed by field name. A successful state request answers
//! with:
//!
//! ```text
//! {"patches": [{op, path, value?}, ...], "ids_of_cells_that_ran": [id, ...]}
//! ```
//!
//! # Example
//!
//! ```
//! use bondsync_common::diff;
//! use serde_json::json;
//!
//! let before = json!({"cells": {"c1": 1}});
//! let after = json!({"cells": {"c1": 2}});
//!
//! let patches = diff::diff(&before, &after);
//! assert_eq!(patches.len(), 1);
//! ```

pub mod diff;
pub mod engine;
pub mod hash;
pub mod protocol;
pub mod transport;

pub use engine::{Engine, EngineHandle, OpenedDocument};
pub use hash::document_hash;
pub use protocol::*;
