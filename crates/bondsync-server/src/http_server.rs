//! HTTP Server
//!
//! Binding is split from serving so that a port conflict is reported
//! before any document is started.

use axum::Router;
use bondsync_common::protocol::error::{BondsyncError, Result};
use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// A bound listener, ready to serve.
pub struct HttpServer {
    listener: TcpListener,
}

impl HttpServer {
    /// Binds the listening socket.
    ///
    /// # Errors
    /// - `PortInUse` - Another process already listens on `addr`
    /// - `Listen` - Any other bind failure
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| match e.kind() {
            ErrorKind::AddrInUse => BondsyncError::PortInUse(addr),
            _ => BondsyncError::Listen {
                addr,
                reason: e.to_string(),
            },
        })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves `app` until `shutdown` resolves.
    pub async fn serve<F>(self, app: Router, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("HTTP server listening on {}", self.local_addr()?);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
