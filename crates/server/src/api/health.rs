use axum::Json;
use chrono::{SecondsFormat, Utc};

use super::schemas::HealthResponse;

/// Reported API version.
pub const API_VERSION: &str = "1.0.0";

/// `GET /api/health` -- liveness probe.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    summary = "Health check",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: API_VERSION.into(),
    })
}
