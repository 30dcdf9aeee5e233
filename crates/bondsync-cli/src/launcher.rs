//! Wiring between parsed arguments and the server.

use anyhow::Result;
use bondsync_client::HttpEngine;
use bondsync_server::{BondServer, Document, ServerConfig};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Validates that a URL string starts with http://
///
/// # Arguments
///
/// * `url` - The URL string to validate
/// * `description` - Human-readable description of what the URL is for (e.g., "engine URL")
///
/// # Errors
///
/// Returns an error if the URL doesn't start with http://
pub fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http://",
            description,
            url
        ))
    }
}

/// Reads and hashes every document, in argument order.
///
/// Documents with identical source are served once: the first path wins and
/// the others are skipped with a warning.
pub async fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let mut seen = HashSet::new();
    let mut documents = Vec::with_capacity(paths.len());

    for path in paths {
        let document = Document::load(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;

        if !seen.insert(document.hash.clone()) {
            tracing::warn!(
                "Skipping {}: same content as an earlier document ({})",
                path.display(),
                document.hash
            );
            continue;
        }
        documents.push(document);
    }

    Ok(documents)
}

/// Runs the server until Ctrl-C, then releases every engine instance.
pub async fn serve(config: ServerConfig, engine_url: &str, paths: &[PathBuf]) -> Result<()> {
    validate_http_url(engine_url, "engine URL")?;

    let documents = load_documents(paths).await?;
    if documents.is_empty() {
        anyhow::bail!("No documents to serve");
    }
    tracing::info!("Serving {} documents", documents.len());
    for document in &documents {
        tracing::info!("  {} -> {}", document.path.display(), document.hash);
    }

    let engine = Arc::new(HttpEngine::new(engine_url)?);
    let server = BondServer::new(config, engine, documents)?;
    server.run(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
