//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics};
use tracing::warn;

use crate::response::HealthResponse;
use crate::state::AppState;

/// Checks both backends and records the result in the health registry.
async fn refresh_checks(state: &AppState) {
    let (store_ok, queue_ok) = tokio::join!(state.store.health_check(), state.queue.health_check());
    health().store.record(store_ok, "Record store unreachable");
    health().queue.record(queue_ok, "Work queue unreachable");
}

/// GET /health - Full health check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    refresh_checks(&state).await;

    let queue_depth = match state.queue.depth().await {
        Ok(depth) => {
            metrics().queue_depth.set(depth);
            depth
        }
        Err(e) => {
            warn!(error = %e, "Failed to read queue depth");
            metrics().queue_depth.get()
        }
    };

    Json(HealthResponse {
        status: health().report().status.as_str().to_string(),
        store_connected: health().store.is_healthy(),
        queue_connected: health().queue.is_healthy(),
        queue_depth,
    })
}

/// GET /health/ready - Readiness check (can accept submissions).
pub async fn ready_handler(State(state): State<AppState>) -> StatusCode {
    refresh_checks(&state).await;

    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness check (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
