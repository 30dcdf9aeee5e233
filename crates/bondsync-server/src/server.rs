use axum::Router;
use bondsync_common::protocol::error::{BondsyncError, Result};
use bondsync_common::Engine;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::bond_update::BondUpdateHandler;
use crate::config::ServerConfig;
use crate::document::Document;
use crate::http_router::{build_router, AppState};
use crate::http_server::HttpServer;
use crate::session::SessionRegistry;
use crate::startup::{shutdown_running, StartupDriver, StartupReport};

/// A sync server for a fixed set of documents.
///
/// Owns the session registry and wires it to the engine, the startup
/// driver and the HTTP router.
pub struct BondServer {
    config: ServerConfig,
    engine: Arc<dyn Engine>,
    documents: Vec<Document>,
    registry: Arc<SessionRegistry>,
    updates: Arc<BondUpdateHandler>,
}

impl BondServer {
    /// Creates a server with one queued session per document.
    ///
    /// # Errors
    /// `InvalidRequest` if two documents have the same hash.
    pub fn new(
        config: ServerConfig,
        engine: Arc<dyn Engine>,
        documents: Vec<Document>,
    ) -> Result<Self> {
        let registry = Arc::new(SessionRegistry::new(
            documents.iter().map(|d| d.hash.clone()),
        )?);
        let updates = Arc::new(
            BondUpdateHandler::new(registry.clone(), engine.clone(), config.layout.clone())
                .with_simulated_lag(config.simulated_lag),
        );

        Ok(Self {
            config,
            engine,
            documents,
            registry,
            updates,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Axum application answering against this server's registry.
    pub fn router(&self) -> Router {
        build_router(
            AppState {
                registry: self.registry.clone(),
                updates: self.updates.clone(),
            },
            self.config.static_dir.clone(),
        )
    }

    /// Runs the startup driver over every document.
    pub async fn start(&self) -> StartupReport {
        StartupDriver::new(self.registry.clone(), self.engine.clone(), &self.config)
            .run(&self.documents)
            .await
    }

    /// Shuts down every running engine instance.
    pub async fn shutdown(&self) -> usize {
        shutdown_running(&self.registry, self.engine.as_ref()).await
    }

    /// Binds, serves, starts every document, and serves until `shutdown`.
    ///
    /// The listener is bound before any document starts, so a port conflict
    /// fails fast. While documents start, their sessions answer 503. If
    /// `shutdown` fires during startup, the document being opened finishes
    /// and is shut down with the others; later documents are never opened.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server = HttpServer::bind(self.config.bind).await?;
        let mut serving = tokio::spawn(server.serve(self.router(), shutdown));

        let (stop_tx, stop_rx) = watch::channel(false);
        let driver = StartupDriver::new(self.registry.clone(), self.engine.clone(), &self.config);
        let startup = driver.run_until_stopped(&self.documents, stop_rx);
        tokio::pin!(startup);

        let stopped_early = tokio::select! {
            report = &mut startup => {
                log_report(self.documents.len(), &report);
                None
            }
            served = &mut serving => Some(served),
        };

        let served = match stopped_early {
            Some(served) => {
                info!("Stopped during startup, finishing the document in flight");
                let _ = stop_tx.send(true);
                (&mut startup).await;
                served
            }
            None => (&mut serving).await,
        };

        self.shutdown().await;
        served.map_err(|e| BondsyncError::Transport(format!("server task failed: {}", e)))?
    }
}

fn log_report(documents: usize, report: &StartupReport) {
    info!(
        "Serving {} documents ({} failed)",
        documents,
        report.failed.len()
    );
}
