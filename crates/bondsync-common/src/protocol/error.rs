use hyper::StatusCode;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BondsyncError {
    #[error("Notebook not found: {0}")]
    NotFound(String),

    #[error("Notebook still loading: {0}")]
    StillLoading(String),

    #[error("Failed to deserialize bond values: {0}")]
    Deserialization(String),

    #[error("Execution engine failure: {0}")]
    Engine(String),

    #[error("Port already in use: {0}")]
    PortInUse(SocketAddr),

    #[error("Failed to listen on {addr}: {reason}")]
    Listen { addr: SocketAddr, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),

    #[error("Patch does not apply: {0}")]
    Patch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BondsyncError {
    /// HTTP status a viewer sees for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BondsyncError::NotFound(_) => StatusCode::NOT_FOUND,
            BondsyncError::StillLoading(_) => StatusCode::SERVICE_UNAVAILABLE,
            BondsyncError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short category description sent to viewers.
    ///
    /// Never includes the inner message, which may carry engine output or
    /// filesystem paths.
    pub fn client_message(&self) -> &'static str {
        match self {
            BondsyncError::NotFound(_) => "Notebook not found",
            BondsyncError::StillLoading(_) => "Notebook is still loading",
            BondsyncError::Deserialization(_) => "Failed to deserialize bond values",
            BondsyncError::Engine(_) => "Failed to run notebook",
            BondsyncError::InvalidRequest(_) => "Invalid request",
            _ => "Internal server error",
        }
    }
}

pub type Result<T> = std::result::Result<T, BondsyncError>;
