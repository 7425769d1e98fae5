use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::SlotKey;

/// One lock-table entry. `users` counts leases (holders and waiters).
#[derive(Default)]
struct SlotCell {
    mutex: Arc<Mutex<()>>,
    users: AtomicUsize,
}

/// Per-slot-key mutual exclusion.
///
/// Entries are created on first checkout and removed when the last lease
/// for the key is dropped, so the table only holds keys with a caller
/// currently holding or awaiting the lock.
#[derive(Default)]
pub struct SlotLocks {
    cells: DashMap<SlotKey, Arc<SlotCell>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `key`. The returned lease does not hold the lock yet.
    pub fn checkout(self: &Arc<Self>, key: SlotKey) -> SlotLease {
        // The increment happens under the shard lock, so it cannot race
        // with the removal in `SlotLease::drop`.
        let cell = {
            let entry = self.cells.entry(key).or_default();
            entry.users.fetch_add(1, Ordering::AcqRel);
            entry.value().clone()
        };
        metrics::gauge!(crate::observability::LOCK_TABLE_ENTRIES).set(self.cells.len() as f64);
        SlotLease {
            locks: self.clone(),
            key,
            mutex: cell.mutex.clone(),
            guard: None,
        }
    }

    /// Live entries.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn release(&self, key: &SlotKey) {
        self.cells
            .remove_if(key, |_, cell| cell.users.fetch_sub(1, Ordering::AcqRel) == 1);
        metrics::gauge!(crate::observability::LOCK_TABLE_ENTRIES).set(self.cells.len() as f64);
    }
}

/// A caller's claim on one slot key. Dropping it (held or not) gives the
/// claim back and reclaims the table entry if nobody else wants it.
pub struct SlotLease {
    locks: Arc<SlotLocks>,
    key: SlotKey,
    mutex: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SlotLease {
    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    pub fn is_locked(&self) -> bool {
        self.guard.is_some()
    }

    /// Wait for exclusive access to the key. Cancel-safe: dropping the
    /// future before it completes leaves the lease unlocked.
    pub async fn lock(&mut self) {
        if self.guard.is_none() {
            self.guard = Some(self.mutex.clone().lock_owned().await);
        }
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        // Unlock before the entry can disappear, otherwise a newcomer could
        // lock a fresh cell while this guard is still alive.
        self.guard.take();
        self.locks.release(&self.key);
    }
}
