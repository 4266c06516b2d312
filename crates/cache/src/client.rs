//! Redis-backed key-value store for journey records shared across nodes.

use parking_lot::Mutex;
use redis::Commands;
use std::time::Duration;
use tracing::{debug, info, warn};
use waypoint_core::config::RedisConfig;
use waypoint_core::KeyValueStore;

/// Redis store; every write refreshes the key's expiry.
///
/// Commands share one connection. It is dropped after an I/O failure and
/// re-established on the next command.
pub struct RedisStore {
    client: redis::Client,
    conn: Mutex<Option<redis::Connection>>,
    ttl_secs: u64,
    connect_timeout: Duration,
}

impl RedisStore {
    /// Connect to the first configured Redis node and verify it answers.
    pub fn new(config: &RedisConfig, ttl_secs: u64) -> anyhow::Result<Self> {
        let url = config
            .urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, "Connecting to Redis");

        let client = redis::Client::open(url.as_str())?;
        let store = Self {
            client,
            conn: Mutex::new(None),
            ttl_secs,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
        };

        // Verify connectivity
        let pong: String = store.with_connection(|conn| redis::cmd("PING").query(conn))?;
        info!(response = %pong, "Redis connection established");

        Ok(store)
    }

    fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<R>,
    ) -> anyhow::Result<R> {
        let mut slot = self.conn.lock();
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.client.get_connection_with_timeout(self.connect_timeout)?,
        };

        match f(&mut conn) {
            Ok(value) => {
                *slot = Some(conn);
                Ok(value)
            }
            Err(e) => {
                if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
                    warn!(error = %e, "Redis connection lost, reconnecting on next command");
                } else {
                    *slot = Some(conn);
                }
                Err(e.into())
            }
        }
    }

    /// Whether a live connection is currently held for reuse.
    pub fn is_connected(&self) -> bool {
        self.conn.lock().is_some()
    }
}

impl KeyValueStore for RedisStore {
    fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.with_connection(|conn| conn.set_ex::<_, _, ()>(key, value, self.ttl_secs))
    }

    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value: Option<String> = self.with_connection(|conn| conn.get(key))?;
        if value.is_none() {
            debug!(key = key, "Journey record miss");
        }
        Ok(value)
    }

    fn del(&self, key: &str) -> anyhow::Result<()> {
        self.with_connection(|conn| conn.del::<_, ()>(key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_redis_fails_fast() {
        let config = RedisConfig {
            urls: vec!["redis://127.0.0.1:1".to_string()],
            connect_timeout_ms: 50,
        };
        assert!(RedisStore::new(&config, 60).is_err());
    }

    #[test]
    fn test_failed_connect_is_not_cached() {
        let store = RedisStore {
            client: redis::Client::open("redis://127.0.0.1:1").unwrap(),
            conn: Mutex::new(None),
            ttl_secs: 60,
            connect_timeout: Duration::from_millis(50),
        };

        assert!(store.set("FSM_JOURNEY_j1", "{}".to_string()).is_err());
        assert!(!store.is_connected());
        // Each command retries the connection rather than reusing a dead one.
        assert!(store.get("FSM_JOURNEY_j1").is_err());
        assert!(!store.is_connected());
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let config = RedisConfig {
            urls: vec!["not-a-url".to_string()],
            connect_timeout_ms: 50,
        };
        assert!(RedisStore::new(&config, 60).is_err());
    }
}
