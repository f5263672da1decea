//! KV Server - A cache-aside key-value server
//!
//! An in-memory LRU cache in front of a durable backing store, served over HTTP.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kv_server::api::{create_router, AppState};
use kv_server::backend::{Backend, ConnectorPool};
use kv_server::cache::CacheStore;
use kv_server::config::CliArgs;
use kv_server::{Config, KvService};

/// Main entry point for the KV server.
///
/// # Startup Sequence
/// 1. Load configuration from the config file, environment variables and flags
/// 2. Initialize tracing subscriber for logging, then report the config file
/// 3. Build the multi-threaded runtime with the configured worker count
/// 4. Open the backing-store connector pool
/// 5. Create the cache and the cache-aside service
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM, then close the pool
fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let (config, file_status) = Config::load(&args);

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "kv_server={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting KV server");
    file_status.log();
    info!(
        "Configuration loaded: cache_size={}, store_backend={}, store_pool_size={}, store_timeout_ms={}, port={}, worker_threads={}",
        config.cache_size,
        config.store_backend,
        config.store_pool_size,
        config.store_timeout_ms,
        config.server_port,
        config.worker_threads
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let backend = Backend::from_config(&config).context("invalid store configuration")?;
    let pool = ConnectorPool::connect(&backend, config.store_pool_size, config.store_timeout())
        .context("failed to initialize backing store")?;

    let service = KvService::new(CacheStore::new(config.cache_size), pool);
    let state = AppState::new(service);
    info!(capacity = state.service.cache().capacity(), "Cache initialized");

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.service.close();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
