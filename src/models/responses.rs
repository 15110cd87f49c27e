//! Response DTOs for the product cache API
//!
//! Bodies of the management routes. Pass-through routes return the catalog
//! payload unchanged.

use serde::Serialize;

use crate::cache::CacheEntry;

/// Response body for `GET /cache/entry`: metadata of a live entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub key: String,
    /// Epoch milliseconds
    pub written_at: u64,
    pub ttl_ms: u64,
    pub ttl_remaining_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
}

impl EntryResponse {
    pub fn new(key: impl Into<String>, entry: &CacheEntry, now_ms: u64) -> Self {
        Self {
            key: key.into(),
            written_at: entry.written_at,
            ttl_ms: entry.ttl,
            ttl_remaining_ms: entry.ttl_remaining_ms(now_ms),
            validator: entry.validator.clone(),
        }
    }
}

/// Response body for `POST /cache/invalidate`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub pattern: String,
    /// Number of entries removed
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(pattern: impl Into<String>, removed: usize) -> Self {
        Self {
            pattern: pattern.into(),
            removed,
        }
    }
}

/// Response body for `DELETE /cache` and `POST /cache/clear-expired`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            message: "Cache cleared".to_string(),
            removed: None,
        }
    }

    pub fn expired(removed: usize) -> Self {
        Self {
            message: format!("Removed {} expired entries", removed),
            removed: Some(removed),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
