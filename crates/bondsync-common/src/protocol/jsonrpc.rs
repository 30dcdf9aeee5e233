//! JSON-RPC 2.0 types for talking to the execution engine
//!
//! The server reaches an out-of-process execution engine over JSON-RPC 2.0
//! on HTTP. Only the client side lives in this repository; the response and
//! error shapes are what the engine answers with.
//!
//! # Engine methods
//!
//! | Method | Params | Result |
//! |---|---|---|
//! | `engine.open` | `{path, source}` | `{handle, snapshot}` |
//! | `engine.rerun` | `{handle, bonds, is_first_value}` | `{ran: [cell id]}` |
//! | `engine.snapshot` | `{handle}` | snapshot |
//! | `engine.bond_connections` | `{handle}` | `{name: [name]}` |
//! | `engine.shutdown` | `{handle}` | `null` |
//!
//! Errors use the standard JSON-RPC codes, plus `-32000` when the document
//! itself failed to run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const METHOD_OPEN: &str = "engine.open";
pub const METHOD_RERUN: &str = "engine.rerun";
pub const METHOD_SNAPSHOT: &str = "engine.snapshot";
pub const METHOD_BOND_CONNECTIONS: &str = "engine.bond_connections";
pub const METHOD_SHUTDOWN: &str = "engine.shutdown";

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,
    /// Name of the method to invoke
    pub method: String,
    /// Parameter values
    #[serde(default)]
    pub params: Value,
    /// Request identifier (number, string, or null)
    pub id: Value,
}

/// JSON-RPC 2.0 response
///
/// Exactly one of `result` and `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC 2.0 error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// The engine ran the request but the document raised
pub const ENGINE_ERROR: i32 = -32000;

impl JsonRpcError {
    /// Create an engine error (-32000)
    ///
    /// Used by an engine when running the document itself failed.
    pub fn engine_error(msg: &str) -> Self {
        Self {
            code: ENGINE_ERROR,
            message: msg.into(),
            data: None,
        }
    }
}

impl JsonRpcRequest {
    pub fn new(method: &str, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: Value::from(id),
        }
    }
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_jsonrpc_request_serialization() {
        let req = JsonRpcRequest::new(METHOD_RERUN, json!({"handle": "h"}), 7);
        let serialized = serde_json::to_string(&req).unwrap();
        assert!(serialized.contains("\"jsonrpc\":\"2.0\""));
        assert!(serialized.contains("\"method\":\"engine.rerun\""));
        assert!(serialized.contains("\"id\":7"));
    }

    #[test]
    fn test_jsonrpc_response_success() {
        let res = JsonRpcResponse::success(json!(1), json!({"ran": ["c1"]}));
        assert_eq!(res.result, Some(json!({"ran": ["c1"]})));
        assert_eq!(res.error, None);
        assert_eq!(res.jsonrpc, "2.0");
    }

    #[test]
    fn test_engine_error_code() {
        assert_eq!(JsonRpcError::engine_error("test").code, -32000);
    }

    #[test]
    fn test_jsonrpc_response_without_optional_fields() {
        let json = r#"{"jsonrpc":"2.0","result":{"value":42},"id":1}"#;
        let res: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert_eq!(res.result, Some(json!({"value": 42})));
        assert_eq!(res.error, None);
    }

    #[test]
    fn test_jsonrpc_response_with_error_deserialization() {
        let json = r#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"cell 3 threw"},"id":1}"#;
        let res: JsonRpcResponse = serde_json::from_str(json).unwrap();
        let error = res.error.unwrap();
        assert_eq!(error.code, ENGINE_ERROR);
        assert_eq!(error.message, "cell 3 threw");
        assert_eq!(error.data, None);
    }
}
