//! API server. Serves the journey endpoint over HTTP.

use crate::rest::{self, AppState};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use waypoint_core::config::AppConfig;
use waypoint_journey::JourneyEngine;

/// Builds the HTTP routes around `state`.
pub fn router<T: Send + Sync + 'static>(state: AppState<T>) -> Router {
    Router::new()
        .route("/v1/journey", post(rest::handle_journey::<T>))
        // Operational endpoints
        .route("/health", get(rest::health_check::<T>))
        .route("/live", get(rest::liveness))
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer<T> {
    config: AppConfig,
    engine: Arc<JourneyEngine<T>>,
}

impl<T: Send + Sync + 'static> ApiServer<T> {
    pub fn new(config: AppConfig, engine: Arc<JourneyEngine<T>>) -> Self {
        Self { config, engine }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(AppState {
            engine: self.engine.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        });

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
