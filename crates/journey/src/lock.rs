//! Optional per-journey mutual exclusion.
//!
//! Without it the engine is last-writer-wins for concurrent calls on one
//! journey id. These locks only cover calls inside one process; separate
//! processes sharing a store still need external serialization.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

#[derive(Debug, Default, Clone)]
pub struct JourneyLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl JourneyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `journey_id`.
    pub fn with_lock<R>(&self, journey_id: &str, f: impl FnOnce() -> R) -> R {
        let lock = self
            .locks
            .entry(journey_id.to_string())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock();
            f()
        };

        drop(lock);
        // Drop the entry once no other caller holds a handle to it.
        self.locks
            .remove_if(journey_id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    /// Number of journey ids with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
