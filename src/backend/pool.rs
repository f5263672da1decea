//! Connector Pool Module
//!
//! Fixed set of store connections handed out by round robin.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::backend::{Backend, Connection};
use crate::error::{StoreError, StoreResult};

// == Connector Slot ==
/// One store connection plus the lock that serializes its use.
pub struct ConnectorSlot {
    index: usize,
    /// None once the pool is closed
    conn: Mutex<Option<Box<dyn Connection>>>,
}

impl ConnectorSlot {
    fn new(index: usize, conn: Box<dyn Connection>) -> Self {
        Self {
            index,
            conn: Mutex::new(Some(conn)),
        }
    }

    /// Position of this slot in the pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Runs `f` against this slot's connection while holding the slot lock.
    ///
    /// Waits at most `wait` for the lock. If it is not acquired in time, `f`
    /// is never called and [`StoreError::Timeout`] is returned. Fails with
    /// [`StoreError::Closed`] after the pool has been closed.
    pub fn with_connection<T, F>(&self, wait: Duration, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut dyn Connection) -> StoreResult<T>,
    {
        let mut guard = self.conn.try_lock_for(wait).ok_or(StoreError::Timeout(wait))?;
        let boxed = guard.as_mut().ok_or(StoreError::Closed)?;
        let conn: &mut dyn Connection = &mut **boxed;
        f(conn)
    }

    fn close(&self) -> StoreResult<()> {
        match self.conn.lock().take() {
            Some(mut conn) => conn.close(),
            None => Ok(()),
        }
    }
}

// == Connector Pool ==
/// Round-robin pool of independently locked store connections.
///
/// Operations on different slots run in parallel; operations that land on
/// the same slot are serialized by its lock. Every operation runs on the
/// blocking thread pool and is bounded by the pool timeout, which covers
/// both the wait for the slot and the driver call.
pub struct ConnectorPool {
    slots: Vec<Arc<ConnectorSlot>>,
    /// Monotonic round-robin counter
    next: AtomicU64,
    timeout: Duration,
}

impl ConnectorPool {
    // == Connect ==
    /// Opens `size` connections to `backend` (0 is coerced to 1).
    ///
    /// If any connection fails, the ones already opened are closed and the
    /// error is returned.
    pub fn connect(backend: &Backend, size: usize, timeout: Duration) -> StoreResult<Self> {
        let size = size.max(1);
        let mut conns: Vec<Box<dyn Connection>> = Vec::with_capacity(size);

        for index in 0..size {
            match backend.connect() {
                Ok(conn) => conns.push(conn),
                Err(e) => {
                    error!(slot = index, error = %e, "Failed to open store connection");
                    close_opened(conns);
                    return Err(e);
                }
            }
        }

        info!(
            backend = backend.name(),
            pool_size = size,
            "Store connector pool initialized"
        );
        Self::from_connections(conns, timeout)
    }

    /// Builds a pool around already-open connections.
    pub fn from_connections(
        conns: Vec<Box<dyn Connection>>,
        timeout: Duration,
    ) -> StoreResult<Self> {
        if conns.is_empty() {
            return Err(StoreError::Connection(
                "connector pool needs at least one connection".to_string(),
            ));
        }

        let slots = conns
            .into_iter()
            .enumerate()
            .map(|(index, conn)| Arc::new(ConnectorSlot::new(index, conn)))
            .collect();

        Ok(Self {
            slots,
            next: AtomicU64::new(0),
            timeout,
        })
    }

    // == Acquire Slot ==
    /// Returns the next slot in round-robin order.
    ///
    /// Concurrent callers fan out across slots; exact fairness is not
    /// guaranteed.
    pub fn acquire_slot(&self) -> Arc<ConnectorSlot> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let index = (n % self.slots.len() as u64) as usize;
        Arc::clone(&self.slots[index])
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    // == Store Operations ==
    /// Fetches `key` from the store.
    pub async fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let key = key.to_vec();
        self.run("get", move |conn| conn.get(&key)).await
    }

    /// Writes `key` = `value` to the store.
    pub async fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let (key, value) = (key.to_vec(), value.to_vec());
        self.run("put", move |conn| conn.put(&key, &value)).await
    }

    /// Deletes `key` from the store, returning whether a record was removed.
    pub async fn delete(&self, key: &[u8]) -> StoreResult<bool> {
        let key = key.to_vec();
        self.run("delete", move |conn| conn.delete(&key)).await
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn Connection) -> StoreResult<T> + Send + 'static,
    {
        let slot = self.acquire_slot();
        let index = slot.index();
        let timeout = self.timeout;
        let deadline = Instant::now() + timeout;

        // A call still queued for the slot at the deadline gives up without
        // touching the connection
        let task = tokio::task::spawn_blocking(move || {
            let wait = deadline.saturating_duration_since(Instant::now());
            slot.with_connection(wait, f).map_err(|e| match e {
                StoreError::Timeout(_) => StoreError::Timeout(timeout),
                other => other,
            })
        });

        // A driver call that overruns keeps its slot until the driver returns
        let result = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StoreError::Worker(join_err.to_string())),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        };

        if let Err(e) = &result {
            warn!(op, slot = index, error = %e, "Store operation failed");
        }
        result
    }

    // == Close ==
    /// Closes every connection. Later operations fail with `Closed`.
    pub fn close(&self) {
        for slot in &self.slots {
            if let Err(e) = slot.close() {
                warn!(slot = slot.index(), error = %e, "Failed to close store connection");
            }
        }
        info!("Store connector pool closed");
    }
}

/// Closes connections opened before a failed connect, logging failures.
fn close_opened(conns: Vec<Box<dyn Connection>>) {
    for (index, mut conn) in conns.into_iter().enumerate() {
        if let Err(e) = conn.close() {
            warn!(slot = index, error = %e, "Failed to close store connection");
        }
    }
}
