//! Error types for the product cache
//!
//! Only upstream faults cross the cache boundary. Persistence faults live in
//! [`MirrorError`] and are absorbed by the TTL store.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type surfaced to callers of the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Upstream answered with a non-success status
    #[error("Upstream returned status {status} for {url}")]
    Upstream { status: u16, url: String },

    /// Request never produced a response (DNS, connect, TLS, reset...)
    #[error("Transport failure for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Response body was not the JSON we expected
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Caller abandoned the fetch before write-back
    #[error("Fetch aborted: {0}")]
    Aborted(String),

    /// No live entry under the requested key
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Upstream { .. } | CacheError::Transport { .. } | CacheError::Decode { .. } => {
                StatusCode::BAD_GATEWAY
            }
            CacheError::Aborted(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Mirror Error Enum ==
/// Failures of the durable mirror. Never propagated past the TTL store.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Filesystem failure (quota, permissions, missing directory)
    #[error("Mirror I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be encoded or decoded
    #[error("Mirror serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the product cache.
pub type Result<T> = std::result::Result<T, CacheError>;
