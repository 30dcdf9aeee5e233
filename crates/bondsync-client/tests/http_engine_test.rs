//! HTTP Engine Client Integration Tests
//!
//! These tests run the client against a small JSON-RPC server that plays the
//! execution engine, and verify:
//! - Every engine method sends the expected params
//! - Results are decoded into the engine contract types
//! - JSON-RPC errors surface as engine failures
//! - Transport failures surface as transport errors

use bondsync_client::{HttpEngine, HttpEngineConfig};
use bondsync_common::protocol::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use bondsync_common::{BondValues, BondsyncError, Engine, EngineHandle};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

type Calls = Arc<Mutex<Vec<JsonRpcRequest>>>;

fn json_response(response: &JsonRpcResponse) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(response).unwrap();
    Response::builder()
        .header(hyper::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn rpc_error(code: i32, message: &str) -> JsonRpcError {
    JsonRpcError {
        code,
        message: message.into(),
        data: None,
    }
}

/// Fake engine answering each method with a canned result.
struct FakeEngineServer {
    addr: String,
    calls: Calls,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeEngineServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();

        let server_calls = calls.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { continue };
                        let io = TokioIo::new(stream);
                        let calls = server_calls.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let calls = calls.clone();
                                async move { Self::handle(calls, req).await }
                            });
                            let _ = http1::Builder::new().serve_connection(io, service).await;
                        });
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Self {
            addr,
            calls,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    async fn handle(
        calls: Calls,
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let body = req.into_body().collect().await?.to_bytes();
        let request: JsonRpcRequest = match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(_) => {
                let error = JsonRpcResponse::error(Value::Null, rpc_error(-32700, "Parse error"));
                return Ok(json_response(&error));
            }
        };
        calls.lock().unwrap().push(request.clone());

        let response = match request.method.as_str() {
            "engine.open" => JsonRpcResponse::success(
                request.id,
                json!({"handle": "nb-1", "snapshot": {"cell_results": {"c1": 1}, "bonds": {}}}),
            ),
            "engine.rerun" => {
                if request.params["bonds"].get("explode").is_some() {
                    JsonRpcResponse::error(request.id, JsonRpcError::engine_error("cell c1 threw"))
                } else {
                    JsonRpcResponse::success(request.id, json!({"ran": ["c1", "c2"]}))
                }
            }
            "engine.snapshot" => JsonRpcResponse::success(
                request.id,
                json!({"cell_results": {"c1": 2}, "bonds": {"x": 5}}),
            ),
            "engine.bond_connections" => JsonRpcResponse::success(
                request.id,
                json!({"x": ["x", "y"], "y": ["y"]}),
            ),
            "engine.shutdown" => JsonRpcResponse::success(request.id, Value::Null),
            _ => JsonRpcResponse::error(request.id, rpc_error(-32601, "Method not found")),
        };

        Ok(json_response(&response))
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn last_call(&self) -> JsonRpcRequest {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

impl Drop for FakeEngineServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[tokio::test]
async fn test_open_and_run() {
    let server = FakeEngineServer::start().await;
    let engine = HttpEngine::new(server.base_url()).unwrap();

    let opened = engine
        .open_and_run(Path::new("docs/sliders.jl"), "x = 1")
        .await
        .unwrap();

    assert_eq!(opened.handle, EngineHandle("nb-1".into()));
    assert_eq!(opened.snapshot["cell_results"]["c1"], json!(1));

    let call = server.last_call();
    assert_eq!(call.method, "engine.open");
    assert_eq!(call.params["path"], "docs/sliders.jl");
    assert_eq!(call.params["source"], "x = 1");
}

#[tokio::test]
async fn test_rerun_sends_bonds_and_flag() {
    let server = FakeEngineServer::start().await;
    let engine = HttpEngine::new(server.base_url()).unwrap();
    let handle = EngineHandle("nb-1".into());

    let mut bonds = BondValues::new();
    bonds.insert("x".into(), json!(5));

    let ran = engine.rerun(&handle, &bonds, false).await.unwrap();
    assert_eq!(ran, vec!["c1".to_string(), "c2".to_string()]);

    let call = server.last_call();
    assert_eq!(call.method, "engine.rerun");
    assert_eq!(call.params["handle"], "nb-1");
    assert_eq!(call.params["bonds"], json!({"x": 5}));
    assert_eq!(call.params["is_first_value"], json!(false));
}

#[tokio::test]
async fn test_rerun_error_is_engine_failure() {
    let server = FakeEngineServer::start().await;
    let engine = HttpEngine::new(server.base_url()).unwrap();

    let mut bonds = BondValues::new();
    bonds.insert("explode".into(), json!(true));

    let err = engine
        .rerun(&EngineHandle("nb-1".into()), &bonds, false)
        .await
        .unwrap_err();
    assert!(matches!(err, BondsyncError::Engine(ref msg) if msg.contains("cell c1 threw")));
}

#[tokio::test]
async fn test_snapshot_connections_and_shutdown() {
    let server = FakeEngineServer::start().await;
    let engine = HttpEngine::new(server.base_url()).unwrap();
    let handle = EngineHandle("nb-1".into());

    let snapshot = engine.snapshot(&handle).await.unwrap();
    assert_eq!(snapshot["bonds"]["x"], json!(5));

    let connections = engine.bond_connections(&handle).await.unwrap();
    assert_eq!(connections.len(), 2);
    assert!(connections["x"].contains("y"));

    engine.shutdown(&handle).await.unwrap();
    assert_eq!(server.last_call().method, "engine.shutdown");
}

#[tokio::test]
async fn test_unreachable_engine_is_transport_error() {
    // Bind and drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let engine = HttpEngine::with_config(
        HttpEngineConfig::new(format!("http://{}", addr)).with_timeout(Duration::from_secs(2)),
    )
    .unwrap();

    let err = engine.snapshot(&EngineHandle("nb-1".into())).await.unwrap_err();
    assert!(matches!(err, BondsyncError::Transport(_)));
}

#[tokio::test]
async fn test_concurrent_calls_for_different_handles() {
    let server = FakeEngineServer::start().await;
    let engine = Arc::new(HttpEngine::new(server.base_url()).unwrap());

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.snapshot(&EngineHandle("a".into())).await })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.snapshot(&EngineHandle("b".into())).await })
    };

    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());
    assert_eq!(server.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_timeout_covers_a_stalled_response_body() {
    // Sends the headers and part of the body, then goes quiet
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf).await;
        stream
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"jsonrpc\"",
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(stream);
    });

    let engine = HttpEngine::with_config(
        HttpEngineConfig::new(format!("http://{}", addr)).with_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        engine.snapshot(&EngineHandle("nb-1".into())),
    )
    .await
    .expect("snapshot should give up on its own");

    assert!(matches!(result, Err(BondsyncError::Transport(ref msg)) if msg.contains("timed out")));
}
