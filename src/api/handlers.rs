//! API Handlers
//!
//! HTTP request handlers mapping each endpoint onto the cache-aside service.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::Result;
use crate::models::{
    validate_key, validate_value, DeleteResponse, HealthResponse, MetricsResponse, PutQuery,
    PutResponse, ResetResponse,
};
use crate::service::KvService;

/// Request and error counters for the key-value endpoints.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    requests: AtomicU64,
    errors: AtomicU64,
}

impl RequestMetrics {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache-aside service over the cache and the store pool
    pub service: Arc<KvService>,
    /// Request counters for /metrics
    pub metrics: Arc<RequestMetrics>,
}

impl AppState {
    /// Creates a new AppState around the given service.
    pub fn new(service: KvService) -> Self {
        Self {
            service: Arc::new(service),
            metrics: Arc::new(RequestMetrics::default()),
        }
    }

    /// Counts a key-value request and, if it fails, an error.
    async fn track<T>(&self, request: impl Future<Output = Result<T>>) -> Result<T> {
        self.metrics.record_request();
        let result = request.await;
        if result.is_err() {
            self.metrics.record_error();
        }
        result
    }
}

/// Key from the wildcard segment; the bare prefix route yields an empty key.
fn key_from(path: Option<Path<String>>) -> String {
    path.map(|Path(key)| key).unwrap_or_default()
}

/// Handler for PUT /put/*key
///
/// Stores the value from `?value=` (or the request body) under `key`.
pub async fn put_handler(
    State(state): State<AppState>,
    path: Option<Path<String>>,
    Query(query): Query<PutQuery>,
    body: Bytes,
) -> Result<Json<PutResponse>> {
    let key = key_from(path);
    state
        .track(async {
            validate_key(&key)?;
            let value = query.into_value(&body);
            validate_value(&value)?;

            state.service.write(key.as_bytes().to_vec(), value).await?;
            Ok(Json(PutResponse::new(key.clone())))
        })
        .await
}

/// Handler for GET /get/*key
///
/// Returns the raw value bytes.
pub async fn get_handler(
    State(state): State<AppState>,
    path: Option<Path<String>>,
) -> Result<Response> {
    let key = key_from(path);
    state
        .track(async {
            validate_key(&key)?;
            let value = state.service.read(key.as_bytes()).await?;

            Ok(([(header::CONTENT_TYPE, "application/octet-stream")], value).into_response())
        })
        .await
}

/// Handler for DELETE /delete/*key
pub async fn delete_handler(
    State(state): State<AppState>,
    path: Option<Path<String>>,
) -> Result<Json<DeleteResponse>> {
    let key = key_from(path);
    state
        .track(async {
            validate_key(&key)?;
            state.service.delete(key.as_bytes()).await?;

            Ok(Json(DeleteResponse::new(key.clone())))
        })
        .await
}

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    let cache = state.service.cache().stats();

    Json(MetricsResponse::new(
        state.metrics.requests(),
        state.metrics.errors(),
        &cache,
    ))
}

/// Handler for POST /metrics/reset
pub async fn reset_metrics_handler(State(state): State<AppState>) -> Json<ResetResponse> {
    state.service.cache().reset_stats();
    Json(ResetResponse::done())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, ConnectorPool, MemoryStore};
    use crate::cache::CacheStore;
    use crate::error::KvError;
    use std::time::Duration;

    fn test_state() -> AppState {
        let pool = ConnectorPool::connect(
            &Backend::Memory(MemoryStore::new()),
            2,
            Duration::from_secs(1),
        )
        .unwrap();
        AppState::new(KvService::new(CacheStore::new(100), pool))
    }

    #[tokio::test]
    async fn test_put_and_get_handler() {
        let state = test_state();

        let result = put_handler(
            State(state.clone()),
            Some(Path("test_key".to_string())),
            Query(PutQuery {
                value: Some("test_value".to_string()),
            }),
            Bytes::new(),
        )
        .await;
        assert!(result.is_ok());

        let response = get_handler(State(state.clone()), Some(Path("test_key".to_string())))
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"test_value");
        assert_eq!(state.metrics.requests(), 2);
        assert_eq!(state.metrics.errors(), 0);
    }

    #[tokio::test]
    async fn test_put_uses_body_without_query_value() {
        let state = test_state();

        put_handler(
            State(state.clone()),
            Some(Path("k".to_string())),
            Query(PutQuery::default()),
            Bytes::from_static(b"body-value"),
        )
        .await
        .unwrap();

        assert_eq!(state.service.read(b"k").await.unwrap(), b"body-value".to_vec());
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result =
            get_handler(State(state.clone()), Some(Path("nonexistent".to_string()))).await;

        assert!(matches!(result, Err(KvError::NotFound(_))));
        assert_eq!(state.metrics.errors(), 1);
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();
        state
            .service
            .write(b"to_delete".to_vec(), b"value".to_vec())
            .await
            .unwrap();

        let key = || Some(Path("to_delete".to_string()));
        let result = delete_handler(State(state.clone()), key()).await;
        assert!(result.is_ok());

        let result = delete_handler(State(state.clone()), key()).await;
        assert!(matches!(result, Err(KvError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_empty_key_rejected() {
        let state = test_state();

        let result = put_handler(
            State(state.clone()),
            None,
            Query(PutQuery::default()),
            Bytes::from_static(b"v"),
        )
        .await;

        assert!(matches!(result, Err(KvError::InvalidRequest(_))));
        assert_eq!(state.metrics.requests(), 1);
        assert_eq!(state.metrics.errors(), 1);
    }

    #[tokio::test]
    async fn test_metrics_and_reset_handlers() {
        let state = test_state();
        state.service.write(b"k".to_vec(), b"v".to_vec()).await.unwrap();
        state.service.read(b"k").await.unwrap();

        let response = metrics_handler(State(state.clone())).await;
        assert_eq!(response.cache_hits, 1);
        assert_eq!(response.cache_entries, 1);
        assert_eq!(response.cache_capacity, 100);

        reset_metrics_handler(State(state.clone())).await;

        let response = metrics_handler(State(state)).await;
        assert_eq!(response.cache_hits, 0);
        assert_eq!(response.cache_entries, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
