use crate::services::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "assist-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: the upload directory is writable and the provider is configured.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if !state.store.is_writable().await {
        tracing::warn!("Readiness failed: upload directory not writable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    match state.assistant.health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Readiness failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
