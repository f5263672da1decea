//! Configuration Module
//!
//! Handles loading server configuration from an optional JSON file,
//! environment variables and command-line flags.

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

/// File read when `CONFIG_FILE` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "server_config.json";

/// Server configuration parameters.
///
/// All values can be configured via the config file or environment variables,
/// with sensible defaults. Set once at startup, read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Runtime worker threads handling requests
    pub worker_threads: usize,
    /// Maximum number of entries the cache can hold
    pub cache_size: usize,
    /// Backing store driver: "sqlite" or "memory"
    pub store_backend: String,
    /// SQLite database file
    pub store_path: String,
    /// Number of backing-store connections
    pub store_pool_size: usize,
    /// Upper bound for a single backing-store call, in milliseconds
    pub store_timeout_ms: u64,
    /// Default tracing level when RUST_LOG is unset
    pub log_level: String,
}

// == Command Line ==
/// Command-line overrides, applied after the config file and environment.
#[derive(Parser, Debug, Default)]
#[command(
    name = "kv_server",
    version = env!("CARGO_PKG_VERSION"),
    about = "Cache-aside key-value server",
    long_about = None
)]
pub struct CliArgs {
    /// Server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Runtime worker threads
    #[arg(long)]
    pub threads: Option<usize>,

    /// Cache capacity in entries
    #[arg(long = "cache-size")]
    pub cache_size: Option<usize>,

    /// Default log level (trace, debug, info, warn, error, off)
    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    /// Backing store driver: sqlite or memory
    #[arg(long = "store-backend")]
    pub store_backend: Option<String>,

    /// SQLite database file
    #[arg(long = "store-path")]
    pub store_path: Option<String>,

    /// Store connection pool size
    #[arg(long = "store-pool")]
    pub store_pool_size: Option<usize>,

    /// Store call timeout in milliseconds
    #[arg(long = "store-timeout-ms")]
    pub store_timeout_ms: Option<u64>,
}

// == File Status ==
/// What happened to the config file during [`Config::load`].
///
/// Loading runs before logging is set up, so the caller reports this once
/// the subscriber is installed.
#[derive(Debug)]
pub enum FileStatus {
    /// No config file present
    Absent,
    /// File parsed and applied
    Loaded(String),
    /// File present but unreadable or malformed; defaults were used
    Failed(String, anyhow::Error),
}

impl FileStatus {
    pub fn log(&self) {
        match self {
            FileStatus::Absent => {}
            FileStatus::Loaded(path) => info!("Loaded {}", path),
            FileStatus::Failed(path, e) => warn!("Failed to read {}: {}", path, e),
        }
    }
}

impl Config {
    // == Load ==
    /// Loads defaults, then the config file, then environment overrides,
    /// then command-line flags.
    ///
    /// The file is `$CONFIG_FILE` if set, otherwise `server_config.json` when
    /// it exists. A malformed file is ignored and reported in the status.
    pub fn load(args: &CliArgs) -> (Self, FileStatus) {
        let path = env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let (base, status) = Self::load_file(&path);
        (base.with_env_overrides().with_cli_overrides(args), status)
    }

    fn load_file(path: &str) -> (Self, FileStatus) {
        if !Path::new(path).exists() {
            return (Self::default(), FileStatus::Absent);
        }
        match Self::from_file(path) {
            Ok(config) => (config, FileStatus::Loaded(path.to_string())),
            Err(e) => (Self::default(), FileStatus::Failed(path.to_string(), e)),
        }
    }

    /// Parses a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Applies any environment variables that are set and parse cleanly.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `WORKER_THREADS` - Runtime worker threads (default: 8)
    /// - `CACHE_SIZE` - Cache capacity in entries (default: 20000)
    /// - `STORE_BACKEND` - `sqlite` or `memory` (default: sqlite)
    /// - `STORE_PATH` - SQLite database file (default: kv_store.db)
    /// - `STORE_POOL_SIZE` - Store connections (default: 4)
    /// - `STORE_TIMEOUT_MS` - Store call timeout (default: 5000)
    /// - `LOG_LEVEL` - Default log level (default: info)
    pub fn with_env_overrides(mut self) -> Self {
        override_from_env("SERVER_PORT", &mut self.server_port);
        override_from_env("WORKER_THREADS", &mut self.worker_threads);
        override_from_env("CACHE_SIZE", &mut self.cache_size);
        override_from_env("STORE_BACKEND", &mut self.store_backend);
        override_from_env("STORE_PATH", &mut self.store_path);
        override_from_env("STORE_POOL_SIZE", &mut self.store_pool_size);
        override_from_env("STORE_TIMEOUT_MS", &mut self.store_timeout_ms);
        override_from_env("LOG_LEVEL", &mut self.log_level);
        self
    }

    /// Applies the flags that were given on the command line.
    pub fn with_cli_overrides(mut self, args: &CliArgs) -> Self {
        override_from_arg(&args.port, &mut self.server_port);
        override_from_arg(&args.threads, &mut self.worker_threads);
        override_from_arg(&args.cache_size, &mut self.cache_size);
        override_from_arg(&args.log_level, &mut self.log_level);
        override_from_arg(&args.store_backend, &mut self.store_backend);
        override_from_arg(&args.store_path, &mut self.store_path);
        override_from_arg(&args.store_pool_size, &mut self.store_pool_size);
        override_from_arg(&args.store_timeout_ms, &mut self.store_timeout_ms);
        self
    }

    /// Store call timeout as a Duration.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn override_from_env<T: FromStr>(name: &str, target: &mut T) {
    if let Some(value) = env::var(name).ok().and_then(|v| v.parse().ok()) {
        *target = value;
    }
}

fn override_from_arg<T: Clone>(arg: &Option<T>, target: &mut T) {
    if let Some(value) = arg {
        *target = value.clone();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            worker_threads: 8,
            cache_size: 20_000,
            store_backend: "sqlite".to_string(),
            store_path: "kv_store.db".to_string(),
            store_pool_size: 4,
            store_timeout_ms: 5_000,
            log_level: "info".to_string(),
        }
    }
}
