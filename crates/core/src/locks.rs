//! Per-record write serialisation.
//!
//! Every read-modify-write of a record runs inside [`RecordLocks::with_lock`], so at
//! most one transition per record id is in flight at any time. Writes to different
//! records proceed in parallel.

use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use ward_uuid::RecordId;

#[derive(Debug, Default)]
pub struct RecordLocks {
    locks: DashMap<RecordId, Arc<Mutex<()>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `id`.
    pub fn with_lock<T>(&self, id: RecordId, f: impl FnOnce() -> T) -> T {
        // Clone the Arc out so the map shard is released before blocking on the mutex.
        let lock = self.locks.entry(id).or_default().value().clone();
        let result = {
            // The guarded value is (); a poisoned lock carries no state.
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };
        drop(lock);
        // Only the map's own handle left means nobody else is waiting on this id.
        self.locks
            .remove_if(&id, |_, entry| Arc::strong_count(entry) == 1);
        result
    }

    /// Number of ids with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
