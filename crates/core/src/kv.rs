//! Key-value persistence contract for journey records.
//!
//! Backends live in `waypoint-cache` (in-process and Redis). Values are the
//! serialized journey records; expiry is a property of the backend.

/// Minimal string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn set(&self, key: &str, value: String) -> anyhow::Result<()>;

    /// Returns `Ok(None)` when the key is absent or expired.
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn del(&self, key: &str) -> anyhow::Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key)
    }

    fn del(&self, key: &str) -> anyhow::Result<()> {
        (**self).del(key)
    }
}
