use async_trait::async_trait;
use bondsync_common::protocol::error::{BondsyncError, Result};
use bondsync_common::protocol::jsonrpc::{
    JsonRpcRequest, METHOD_BOND_CONNECTIONS, METHOD_OPEN, METHOD_RERUN, METHOD_SHUTDOWN,
    METHOD_SNAPSHOT,
};
use bondsync_common::transport::HttpTransport;
use bondsync_common::{
    BondConnections, BondValues, CellId, Engine, EngineHandle, OpenedDocument, Snapshot,
};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Configuration for the engine client.
#[derive(Debug, Clone)]
pub struct HttpEngineConfig {
    /// Base URL of the engine, e.g. `http://127.0.0.1:1234`
    pub base_url: String,
    /// Timeout for every call except `engine.rerun`
    ///
    /// Re-runs are never timed out: a slow document only holds up its own
    /// session queue. Opening a document runs it in full, so the default is
    /// generous.
    /// Default: 10 minutes
    pub timeout: Duration,
}

impl HttpEngineConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct RerunResult {
    ran: Vec<CellId>,
}

/// Engine reached over JSON-RPC on HTTP.
///
/// Each call is an independent HTTP request, so calls for different handles
/// run in parallel over the shared connection pool.
pub struct HttpEngine {
    base_url: String,
    timeout: Duration,
    client: Client<HttpConnector, Full<Bytes>>,
    next_id: AtomicU64,
}

impl HttpEngine {
    /// Creates a client for the engine at `base_url`.
    ///
    /// The URL must start with `http://`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(HttpEngineConfig::new(base_url))
    }

    pub fn with_config(config: HttpEngineConfig) -> Result<Self> {
        if !config.base_url.starts_with("http://") {
            return Err(BondsyncError::InvalidRequest(format!(
                "engine URL '{}' must start with http://",
                config.base_url
            )));
        }

        let client = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one JSON-RPC call and returns its result.
    ///
    /// `timeout` covers the whole exchange, response body included.
    async fn call(&self, method: &str, params: Value, timeout: Option<Duration>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(method, params, id);
        tracing::debug!("Calling engine method {} (id {})", method, id);

        let exchange = self.exchange(method, &request);
        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| {
                    BondsyncError::Transport(format!(
                        "{} timed out after {}ms",
                        method,
                        timeout.as_millis()
                    ))
                })?,
            None => exchange.await,
        }
    }

    async fn exchange(&self, method: &str, request: &JsonRpcRequest) -> Result<Value> {
        let body = serde_json::to_vec(request)?;
        let http_request = hyper::Request::builder()
            .method(hyper::Method::POST)
            .uri(format!("{}/", self.base_url))
            .header(hyper::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| BondsyncError::Transport(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .request(http_request)
            .await
            .map_err(|e| BondsyncError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| BondsyncError::Transport(format!("Failed to read response: {}", e)))?
            .to_bytes();

        if !status.is_success() {
            return Err(BondsyncError::Transport(format!(
                "engine answered {} to {}",
                status, method
            )));
        }

        HttpTransport::parse_jsonrpc_result(&body)
    }
}

#[async_trait]
impl Engine for HttpEngine {
    async fn open_and_run(&self, path: &Path, source: &str) -> Result<OpenedDocument> {
        let params = json!({
            "path": path.display().to_string(),
            "source": source,
        });
        let result = self.call(METHOD_OPEN, params, Some(self.timeout)).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn rerun(
        &self,
        handle: &EngineHandle,
        bonds: &BondValues,
        is_first_value: bool,
    ) -> Result<Vec<CellId>> {
        let params = json!({
            "handle": handle,
            "bonds": bonds,
            "is_first_value": is_first_value,
        });
        let result = self.call(METHOD_RERUN, params, None).await?;
        let result: RerunResult = serde_json::from_value(result)?;
        Ok(result.ran)
    }

    async fn snapshot(&self, handle: &EngineHandle) -> Result<Snapshot> {
        self.call(METHOD_SNAPSHOT, json!({"handle": handle}), Some(self.timeout))
            .await
    }

    async fn bond_connections(&self, handle: &EngineHandle) -> Result<BondConnections> {
        let result = self
            .call(METHOD_BOND_CONNECTIONS, json!({"handle": handle}), Some(self.timeout))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn shutdown(&self, handle: &EngineHandle) -> Result<()> {
        self.call(METHOD_SHUTDOWN, json!({"handle": handle}), Some(self.timeout))
            .await?;
        Ok(())
    }
}
