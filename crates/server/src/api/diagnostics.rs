//! CORS troubleshooting route. Only compiled with the `diagnostics` feature.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::{Value, json};

use super::AppState;

/// `GET /api/debug/cors` -- how the origin of this request is classified.
pub async fn cors(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let origin = headers
        .get("origin")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let allowed = origin
        .as_deref()
        .is_some_and(|o| state.settings.origins.is_allowed(o));
    Json(json!({
        "origin": origin,
        "isAllowedOrigin": allowed,
    }))
}
