//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache and its HTTP surface.
///
/// `Clone` so a single fetch failure can be handed to every caller waiting
/// on the same fetch.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Key not found in cache or in the backing source
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The value factory failed; never cached
    #[error("Fetch failed: {0}")]
    Factory(Arc<anyhow::Error>),

    /// Internal error (e.g. a fetch task panicked)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Wraps a factory failure so it can be shared between waiters.
    pub fn factory(err: impl Into<anyhow::Error>) -> Self {
        CacheError::Factory(Arc::new(err.into()))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CacheError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CacheError::Factory(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
            CacheError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
