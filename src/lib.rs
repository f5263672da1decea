//! KV Server - A cache-aside key-value server
//!
//! An in-memory LRU cache in front of a durable backing store, served over HTTP.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod service;

pub use api::AppState;
pub use config::Config;
pub use service::{KvService, Operation, Outcome};
