//! bondsync engine client
//!
//! Implements the [`Engine`](bondsync_common::Engine) contract against an
//! execution engine running as a separate process and speaking JSON-RPC 2.0
//! over HTTP.

pub mod engine;

pub use engine::{HttpEngine, HttpEngineConfig};
