use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

use crate::services::get_metrics;
use crate::startup::AppState;

/// Liveness probe.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let provider = state.dispatcher.provider();
    Json(json!({
        "status": "ok",
        "service": "meeting-notification-service",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": provider.name(),
        "provider_enabled": provider.is_enabled()
    }))
}

/// Readiness probe: the push provider must be able to send, which for FCM
/// means an access token can be obtained.
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state
        .dispatcher
        .provider()
        .health_check()
        .await
        .map(|_| StatusCode::OK)
        .map_err(|e| {
            tracing::warn!(error = %e, "Push provider is not ready");
            AppError::ServiceUnavailable
        })
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
