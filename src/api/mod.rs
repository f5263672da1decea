//! API Module
//!
//! HTTP handlers and routing for the key-value server.
//!
//! # Endpoints
//! - `PUT /put/*key` - Store a value
//! - `GET /get/*key` - Retrieve a value
//! - `DELETE /delete/*key` - Delete a key
//! - `GET /metrics` - Request and cache counters
//! - `POST /metrics/reset` - Reset cache counters
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
