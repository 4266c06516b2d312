//! Waypoint: resumable multi-step journeys over HTTP.
//!
//! Loads configuration, picks the journey store backend and serves the demo
//! onboarding journey.

mod onboarding;

use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing::{error, info, warn};
use waypoint_api::ApiServer;
use waypoint_cache::{LocalStore, RedisStore};
use waypoint_core::config::{AppConfig, StoreBackend};
use waypoint_core::KeyValueStore;
use waypoint_journey::{JourneyEngine, KeyValueJourneyStore};

use crate::onboarding::OnboardingData;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoreArg {
    Memory,
    Redis,
}

#[derive(Parser, Debug)]
#[command(name = "waypoint")]
#[command(about = "Resumable multi-step journey engine")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "WAYPOINT__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "WAYPOINT__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Journey store backend (overrides config)
    #[arg(long, value_enum)]
    store: Option<StoreArg>,

    /// Serialize concurrent requests on the same journey id
    #[arg(long, default_value_t = false)]
    serialize: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waypoint=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Waypoint starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(store) = cli.store {
        config.store.backend = match store {
            StoreArg::Memory => StoreBackend::Memory,
            StoreArg::Redis => StoreBackend::Redis,
        };
    }
    if cli.serialize {
        config.journey.serialize_per_journey = true;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        backend = ?config.store.backend,
        serialize_per_journey = config.journey.serialize_per_journey,
        "Configuration loaded"
    );

    let kv: Arc<dyn KeyValueStore> = match config.store.backend {
        StoreBackend::Memory => {
            let local = LocalStore::new(config.store.ttl_secs);
            // Spawn eviction task
            let for_maintenance = local.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
                loop {
                    interval.tick().await;
                    let evicted = for_maintenance.evict_expired();
                    if evicted > 0 {
                        info!(evicted, "Expired journeys evicted");
                    }
                }
            });
            Arc::new(local)
        }
        StoreBackend::Redis => Arc::new(RedisStore::new(&config.redis, config.store.ttl_secs)?),
    };

    let store = KeyValueJourneyStore::<OnboardingData, _>::new(kv)
        .with_key_prefix(config.store.key_prefix.clone());
    let engine = Arc::new(JourneyEngine::from_config(
        onboarding::graph()?,
        Arc::new(store),
        &config.journey,
    ));
    info!(states = engine.graph().len(), "Journey graph validated");

    let api_server = ApiServer::new(config.clone(), engine);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Waypoint is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
