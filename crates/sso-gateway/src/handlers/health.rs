//! Operational endpoints.

use crate::domain::error::ApiError;
use crate::service::AppState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let configured = state.handshake.settings().snapshot().secret.is_some();
    Json(serde_json::json!({
        "status": "healthy",
        "service": "discourse-sso",
        "version": env!("CARGO_PKG_VERSION"),
        "configured": configured,
        "trackedNonces": state.handshake.replay_guard().len(),
    }))
}

/// `GET /metrics` in Prometheus text format
pub async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let body = sso_telemetry::encode_metrics().map_err(|e| ApiError::internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
