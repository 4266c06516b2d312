//! REST handlers for journey requests and operational endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};
use waypoint_core::FsmError;
use waypoint_journey::{FsmRequest, FsmResponse, JourneyEngine};

/// Maximum event name length accepted at the API boundary.
const MAX_EVENT_LEN: usize = 128;

/// Shared application state for REST handlers.
pub struct AppState<T> {
    pub engine: Arc<JourneyEngine<T>>,
    pub node_id: String,
    pub start_time: Instant,
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            node_id: self.node_id.clone(),
            start_time: self.start_time,
        }
    }
}

/// Validate a journey request at the API boundary.
fn validate_request(request: &FsmRequest) -> Result<(), &'static str> {
    if request.event.trim().is_empty() {
        return Err("request 'event' must not be empty");
    }
    if request.event.len() > MAX_EVENT_LEN {
        return Err("request 'event' exceeds maximum length");
    }
    Ok(())
}

/// POST /v1/journey: start, advance, resume or step back a journey.
pub async fn handle_journey<T: Send + Sync + 'static>(
    State(state): State<AppState<T>>,
    payload: Result<Json<FsmRequest>, JsonRejection>,
) -> Result<Json<FsmResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Json(request) =
        payload.map_err(|rejection| error_response(&FsmError::bad_request(rejection.body_text())))?;
    if let Err(msg) = validate_request(&request) {
        return Err(error_response(&FsmError::bad_request(msg)));
    }

    // The engine and its collaborators block, keep them off the async workers.
    let engine = state.engine.clone();
    let result = tokio::task::spawn_blocking(move || engine.execute(request))
        .await
        .map_err(|e| FsmError::internal(format!("journey task failed: {e}")))
        .and_then(|r| r);

    result.map(Json).map_err(|err| error_response(&err))
}

fn error_response(err: &FsmError) -> (StatusCode, Json<ErrorResponse>) {
    if err.is_caller_fault() {
        warn!(code = err.code(), error = %err, "Journey request rejected");
    } else {
        error!(code = err.code(), error = %err, "Journey request failed");
    }
    metrics::counter!("api.errors").increment(1);

    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: err.code().to_string(),
            message: err.message().to_string(),
        }),
    )
}

/// GET /health: Health check endpoint.
pub async fn health_check<T: Send + Sync + 'static>(
    State(state): State<AppState<T>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /live: Liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}
