//! API Routes
//!
//! Configures the Axum router with all key-value server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, metrics_handler, put_handler,
    reset_metrics_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /put/*key` - Store a value (`?value=` or request body)
/// - `GET /get/*key` - Retrieve a value
/// - `DELETE /delete/*key` - Delete a key
/// - `GET /metrics` - Request and cache counters
/// - `POST /metrics/reset` - Reset cache counters
/// - `GET /health` - Health check endpoint
///
/// Keys may contain `/`; everything after the route prefix is the key. The
/// bare prefixes reach the same handlers and are rejected as empty keys.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/put/", put(put_handler))
        .route("/put/*key", put(put_handler))
        .route("/get/", get(get_handler))
        .route("/get/*key", get(get_handler))
        .route("/delete/", delete(delete_handler))
        .route("/delete/*key", delete(delete_handler))
        .route("/metrics", get(metrics_handler))
        .route("/metrics/reset", post(reset_metrics_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
