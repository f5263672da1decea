//! Error types for the key-value server
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Store Error Enum ==
/// Failure reported by the backing store or its connector pool.
///
/// Always distinct from "key not found", which is a normal outcome.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Opening or configuring a connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// A query was rejected or returned a malformed result
    #[error("query failed: {0}")]
    Query(String),

    /// The operation did not complete within the store timeout
    #[error("operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The pool has been closed
    #[error("store is closed")]
    Closed,

    /// The blocking worker running the operation died
    #[error("store worker failed: {0}")]
    Worker(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

/// Result type for backing-store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == KV Error Enum ==
/// Unified error type for the key-value server.
#[derive(Error, Debug)]
pub enum KvError {
    /// Key not found in the backing store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Backing store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl KvError {
    /// Builds a NotFound error from raw key bytes.
    pub fn not_found(key: &[u8]) -> Self {
        KvError::NotFound(String::from_utf8_lossy(key).into_owned())
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            KvError::NotFound(_) => StatusCode::NOT_FOUND,
            KvError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            KvError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for KvError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the key-value server.
pub type Result<T> = std::result::Result<T, KvError>;
