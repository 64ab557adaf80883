use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::DashboardState;

/// Health check endpoint
/// Returns 200 OK if the process is running
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "service": "gpu-metrics-dashboard",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

/// Readiness check endpoint
/// Returns 200 OK once the telemetry database answers, 503 otherwise
pub async fn readiness_check(State(state): State<DashboardState>) -> impl IntoResponse {
    let result = match state.source() {
        Ok(source) => source.ping().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => (StatusCode::OK, Json(json!({
            "status": "ready",
            "service": "gpu-metrics-dashboard",
        }))),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, Json(json!({
            "status": "unavailable",
            "service": "gpu-metrics-dashboard",
            "reason": e.to_string(),
        }))),
    }
}
