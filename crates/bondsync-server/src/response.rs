//! Response shaping shared by every API route.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use bondsync_common::transport::{MsgPackCodec, MSGPACK_CONTENT_TYPE};
use bondsync_common::BondsyncError;
use serde::Serialize;
use tracing::debug;

/// Cache-Control of successful state and connection responses.
pub const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Cache-Control of every other API response.
pub const CACHE_NO_STORE: &str = "no-store, no-cache, max-age=5";

/// Marks a response as safe to cache forever.
///
/// Set as a response extension by handlers; read by [`shape_cache_headers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Immutable;

/// MessagePack response body.
///
/// Answers for a given URL never change while the server runs, so every
/// `MsgPack` response is marked [`Immutable`].
pub struct MsgPack<T>(pub T);

impl<T: Serialize> IntoResponse for MsgPack<T> {
    fn into_response(self) -> Response {
        match MsgPackCodec::encode(&self.0) {
            Ok(body) => {
                let mut response =
                    ([(CONTENT_TYPE, HeaderValue::from_static(MSGPACK_CONTENT_TYPE))], body)
                        .into_response();
                response.extensions_mut().insert(Immutable);
                response
            }
            Err(e) => ApiError(e).into_response(),
        }
    }
}

/// Request-scoped failure turned into an HTTP response.
///
/// The body is a short category description; details only go to the log.
#[derive(Debug)]
pub struct ApiError(pub BondsyncError);

impl From<BondsyncError> for ApiError {
    fn from(error: BondsyncError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        debug!("Request failed with {}: {}", status, self.0);
        (status, self.0.client_message()).into_response()
    }
}

/// Sets Cache-Control on every API response.
///
/// Successful responses marked [`Immutable`] are cacheable forever;
/// everything else, errors and loading answers included, must not be stored.
pub async fn shape_cache_headers(mut response: Response) -> Response {
    let immutable =
        response.status().is_success() && response.extensions().get::<Immutable>().is_some();
    let value = if immutable {
        CACHE_IMMUTABLE
    } else {
        CACHE_NO_STORE
    };
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static(value));
    response
}
