/// Resource lock table
///
/// Serializes read-modify-write sequences against one logical resource
/// (usually an account URI). Locks for different keys never block each
/// other; there is no global lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Process-wide map from resource key to its lock
///
/// Entries are created on first use and kept for the lifetime of the
/// table, so its size grows with the number of distinct keys ever locked.
#[derive(Default)]
pub struct ResourceLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held lock; released when dropped or on `unlock`
#[must_use = "the resource is unlocked as soon as the guard is dropped"]
pub struct ResourceGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl ResourceGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release before the end of the enclosing scope
    pub fn unlock(self) {}
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the lock for `key` is free and take it
    pub async fn lock(&self, key: &str) -> ResourceGuard {
        let mutex = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(
                table
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };

        let started = Instant::now();
        let (guard, contended) = match Arc::clone(&mutex).try_lock_owned() {
            Ok(guard) => (guard, false),
            Err(_) => {
                tracing::trace!(key, "waiting for resource lock");
                (mutex.lock_owned().await, true)
            }
        };
        crate::metrics::record_lock_wait(contended, started.elapsed().as_secs_f64());

        ResourceGuard {
            key: key.to_string(),
            _guard: guard,
        }
    }

    /// Number of keys ever locked
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
