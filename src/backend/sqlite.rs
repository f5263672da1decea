//! SQLite backing store driver.

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::backend::Connection;
use crate::error::{StoreError, StoreResult};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS kv_store (
    key   BLOB PRIMARY KEY,
    value BLOB NOT NULL
)";

const UPSERT: &str = "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
    ON CONFLICT (key) DO UPDATE SET value = excluded.value";

const SELECT: &str = "SELECT value FROM kv_store WHERE key = ?1";

const DELETE: &str = "DELETE FROM kv_store WHERE key = ?1";

/// One connection to a SQLite database file.
pub struct SqliteConnection {
    /// None once closed
    conn: Option<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Opens `path`, switches it to WAL mode, and creates the table if missing.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open(path).map_err(|e| {
            StoreError::Connection(format!("failed to open {}: {}", path.display(), e))
        })?;

        conn.busy_timeout(busy_timeout)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        // WAL lets the other pool connections read while one writes
        let mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute(CREATE_TABLE, [])?;

        debug!(path = %path.display(), journal_mode = %mode, "Opened SQLite connection");
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&self) -> StoreResult<&rusqlite::Connection> {
        self.conn.as_ref().ok_or(StoreError::Closed)
    }
}

impl Connection for SqliteConnection {
    fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let mut stmt = self.conn()?.prepare_cached(SELECT)?;
        let value = stmt
            .query_row(params![key], |row| row.get::<_, Vec<u8>>(0))
            .optional()?;
        Ok(value)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let mut stmt = self.conn()?.prepare_cached(UPSERT)?;
        stmt.execute(params![key, value])?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<bool> {
        let mut stmt = self.conn()?.prepare_cached(DELETE)?;
        let removed = stmt.execute(params![key])?;
        Ok(removed > 0)
    }

    fn close(&mut self) -> StoreResult<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| StoreError::from(e)),
            None => Ok(()),
        }
    }
}
