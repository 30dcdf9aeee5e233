//! HTTP helpers for JSON-RPC calls to the execution engine

use crate::protocol::error::{BondsyncError, Result};
use crate::protocol::jsonrpc::JsonRpcResponse;

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Parse a JSON-RPC response and split it into its result or error.
    ///
    /// Error objects become [`BondsyncError::Engine`]. A `null` or absent
    /// result is returned as `Value::Null`.
    pub fn parse_jsonrpc_result(body: &[u8]) -> Result<serde_json::Value> {
        let response: JsonRpcResponse = serde_json::from_slice(body)?;
        if let Some(error) = response.error {
            return Err(BondsyncError::Engine(format!(
                "{} (code {})",
                error.message, error.code
            )));
        }
        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }
}
