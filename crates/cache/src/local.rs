//! In-process key-value store backed by DashMap for lock-free concurrent access.
//! Suits single-node deployments and tests; records vanish with the process.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use waypoint_core::KeyValueStore;

struct Entry {
    value: String,
    inserted_at: Instant,
}

/// Local store with a per-entry time to live.
#[derive(Clone)]
pub struct LocalStore {
    store: Arc<DashMap<String, Entry>>,
    ttl: Duration,
}

impl LocalStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Remove expired entries. Call this periodically from a background task.
    pub fn evict_expired(&self) -> usize {
        let mut evicted = 0;
        self.store.retain(|_, entry| {
            let live = entry.inserted_at.elapsed() <= self.ttl;
            if !live {
                evicted += 1;
            }
            live
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl KeyValueStore for LocalStore {
    fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.store.insert(
            key.to_string(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Expired entries read as absent and are dropped on the way out.
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let Some(entry) = self.store.get(key) else {
            return Ok(None);
        };
        if entry.inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.store.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    fn del(&self, key: &str) -> anyhow::Result<()> {
        self.store.remove(key);
        Ok(())
    }
}
