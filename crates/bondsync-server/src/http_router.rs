//! HTTP Router
//!
//! Maps viewer-facing URLs onto the session registry and the bond update
//! handler:
//! - `GET /` answers 200 once every document is running
//! - `POST /staterequest/{hash}/` and `GET /staterequest/{hash}/{payload}`
//!   apply bond updates
//! - `GET /bondconnections/{hash}/` returns the bond dependency graph
//! - anything else falls through to the static export directory, if any
//!
//! Every response allows any origin. API responses carry a Cache-Control
//! header set by [`shape_cache_headers`].

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bondsync_common::{BondConnections, StateResponse};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::bond_update::{BondPayload, BondUpdateHandler};
use crate::response::{shape_cache_headers, ApiError, MsgPack};
use crate::session::SessionRegistry;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub updates: Arc<BondUpdateHandler>,
}

/// Builds the axum application.
///
/// # Arguments
/// * `state` - Registry and bond update handler
/// * `static_dir` - Directory served for requests no API route matches
pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/", get(index))
        .route("/staterequest/{hash}/", post(state_request_post))
        .route("/staterequest/{hash}/{payload}", get(state_request_get))
        .route("/bondconnections/{hash}/", get(bond_connections))
        .route_layer(map_response(shape_cache_headers));

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(CorsLayer::permissive()).with_state(state)
}

async fn index(State(state): State<AppState>) -> Response {
    if state.registry.is_ready().await {
        (StatusCode::OK, "Hi!").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Still loading").into_response()
    }
}

async fn state_request_post(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    body: Bytes,
) -> Result<MsgPack<StateResponse>, ApiError> {
    let response = state
        .updates
        .handle(&hash, BondPayload::Binary(&body))
        .await?;
    Ok(MsgPack(response))
}

async fn state_request_get(
    State(state): State<AppState>,
    Path((hash, payload)): Path<(String, String)>,
) -> Result<MsgPack<StateResponse>, ApiError> {
    let response = state
        .updates
        .handle(&hash, BondPayload::Base64(&payload))
        .await?;
    Ok(MsgPack(response))
}

async fn bond_connections(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<MsgPack<BondConnections>, ApiError> {
    Ok(MsgPack(state.updates.bond_connections(&hash).await?))
}
