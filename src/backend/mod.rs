//! Backing Store Module
//!
//! The durable system of record behind the cache. Each driver exposes the
//! same three-operation [`Connection`] interface; the driver is chosen once
//! at startup through [`Backend`].

mod memory;
mod pool;
mod sqlite;

use std::path::PathBuf;
use std::time::Duration;

pub use memory::{MemoryConnection, MemoryStore};
pub use pool::{ConnectorPool, ConnectorSlot};
pub use sqlite::SqliteConnection;

use crate::config::Config;
use crate::error::{StoreError, StoreResult};

// == Connection ==
/// One physical connection to the backing store.
///
/// Connections are not shared between threads concurrently; the pool hands
/// each one out under an exclusive lock.
pub trait Connection: Send {
    /// Fetches the value for `key`, or None if no record exists.
    fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Inserts or replaces the record for `key`.
    fn put(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Deletes the record for `key`, returning whether a record was removed.
    fn delete(&mut self, key: &[u8]) -> StoreResult<bool>;

    /// Releases driver resources. The connection is dropped afterwards.
    fn close(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

// == Backend ==
/// Backing-store driver selection.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Process-local map shared by every connection
    Memory(MemoryStore),
    /// SQLite database file
    Sqlite {
        path: PathBuf,
        busy_timeout: Duration,
    },
}

impl Backend {
    /// Builds the backend named by `config.store_backend`.
    pub fn from_config(config: &Config) -> StoreResult<Self> {
        match config.store_backend.to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory(MemoryStore::new())),
            "sqlite" => Ok(Backend::Sqlite {
                path: PathBuf::from(&config.store_path),
                busy_timeout: config.store_timeout(),
            }),
            other => Err(StoreError::Connection(format!(
                "unknown store backend '{}'",
                other
            ))),
        }
    }

    /// Driver name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Memory(_) => "memory",
            Backend::Sqlite { .. } => "sqlite",
        }
    }

    /// Opens a new connection to this backend.
    pub fn connect(&self) -> StoreResult<Box<dyn Connection>> {
        match self {
            Backend::Memory(store) => Ok(Box::new(store.connect())),
            Backend::Sqlite { path, busy_timeout } => {
                Ok(Box::new(SqliteConnection::open(path, *busy_timeout)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_config_memory() {
        let config = Config {
            store_backend: "Memory".to_string(),
            ..Config::default()
        };
        let backend = Backend::from_config(&config).unwrap();
        assert_eq!(backend.name(), "memory");
    }

    #[test]
    fn test_backend_from_config_sqlite() {
        let config = Config {
            store_backend: "sqlite".to_string(),
            store_path: "data/kv.db".to_string(),
            ..Config::default()
        };
        match Backend::from_config(&config).unwrap() {
            Backend::Sqlite { path, .. } => assert_eq!(path, PathBuf::from("data/kv.db")),
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_backend_from_config_unknown() {
        let config = Config {
            store_backend: "postgres".to_string(),
            ..Config::default()
        };
        let result = Backend::from_config(&config);
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }

    #[test]
    fn test_memory_backend_connections_share_records() {
        let backend = Backend::Memory(MemoryStore::new());
        let mut first = backend.connect().unwrap();
        let mut second = backend.connect().unwrap();

        first.put(b"k", b"v").unwrap();

        assert_eq!(second.get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}
