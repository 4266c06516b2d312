use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `WAYPOINT__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub journey: JourneyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Which key-value backend holds journey records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Lifetime of a journey record after its last write.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

// ─── Journey Config ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Deserialize)]
pub struct JourneyConfig {
    /// Upper bound on handler invocations inside one `execute` call.
    #[serde(default = "default_max_internal_hops")]
    pub max_internal_hops: usize,
    /// Serialize concurrent calls on the same journey id within this process.
    #[serde(default)]
    pub serialize_per_journey: bool,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}
fn default_key_prefix() -> String {
    "FSM_JOURNEY_".to_string()
}
fn default_ttl_secs() -> u64 {
    1800
}
fn default_redis_urls() -> Vec<String> {
    vec!["redis://localhost:6379".to_string()]
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_max_internal_hops() -> usize {
    64
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            key_prefix: default_key_prefix(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: default_redis_urls(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            max_internal_hops: default_max_internal_hops(),
            serialize_per_journey: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            store: StoreConfig::default(),
            redis: RedisConfig::default(),
            journey: JourneyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("WAYPOINT")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.key_prefix, "FSM_JOURNEY_");
        assert_eq!(config.journey.max_internal_hops, 64);
        assert!(!config.journey.serialize_per_journey);
    }

    #[test]
    fn test_partial_source_fills_defaults() {
        let config: AppConfig = config::Config::builder()
            .set_override("store.backend", "redis")
            .unwrap()
            .set_override("journey.max_internal_hops", 8)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.journey.max_internal_hops, 8);
        assert_eq!(config.api.http_port, 8080);
        assert_eq!(config.redis.urls, vec!["redis://localhost:6379".to_string()]);
    }
}
