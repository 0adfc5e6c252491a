pub mod admin;
pub mod analysis;
pub mod analyze;
#[cfg(feature = "diagnostics")]
pub mod diagnostics;
pub mod feedback;
pub mod health;
pub mod openapi;
pub mod schemas;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, FromRequestParts};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use exposr_core::ClientContext;
use exposr_detector::DynDetector;
use exposr_intake::FileValidator;
use exposr_store::ResultRepository;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use self::openapi::ApiDoc;
use crate::auth::AdminAuth;
use crate::auth::middleware::AdminAuthLayer;
use crate::client_ip;
use crate::cors::{OriginPolicy, cors_layer};
use crate::error::ServerError;
use crate::ratelimit::{RateLimitLayer, RateLimiter};
use crate::security::with_security_headers;

/// Headroom for multipart framing and the consent field on top of the file
/// size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Request-independent settings handlers need.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Bound on one detector call.
    pub analysis_timeout: Duration,
    pub trust_proxy: bool,
    pub origins: OriginPolicy,
}

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<ResultRepository>,
    pub detector: Arc<dyn DynDetector>,
    pub validator: Arc<FileValidator>,
    pub auth: Arc<AdminAuth>,
    /// Per-IP limit across the API. `None` disables it.
    pub rate_limiter: Option<Arc<RateLimiter>>,
    /// Failed admin logins per IP. `None` disables it.
    pub login_limiter: Option<Arc<RateLimiter>>,
    pub settings: Arc<ApiSettings>,
}

/// Build the router with all API routes and middleware.
pub fn router(state: AppState) -> Router {
    let body_limit = state.validator.max_file_size() + MULTIPART_OVERHEAD;

    let admin = Router::new()
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route_layer(AdminAuthLayer::new(Arc::clone(&state.auth)));

    let api = Router::new()
        .route("/api/health", get(health::health))
        .route(
            "/api/analyze",
            post(analyze::analyze).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/analysis/{analysis_id}",
            get(analysis::get_analysis).delete(analysis::delete_analysis),
        )
        .route("/api/delete", post(analysis::delete_by_code))
        .route("/api/feedback", post(feedback::submit_feedback))
        .route("/api/admin/login", post(admin::login))
        .merge(admin);

    #[cfg(feature = "diagnostics")]
    let api = api.route("/api/debug/cors", get(diagnostics::cors));

    let rate_limit = RateLimitLayer::new(state.rate_limiter.clone(), state.settings.trust_proxy);
    let origins = state.settings.origins.clone();

    let router = api
        .route("/api-doc/openapi.json", get(openapi_json))
        .fallback(not_found)
        .with_state(state)
        .layer(rate_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(origins));

    with_security_headers(router)
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn not_found() -> ServerError {
    ServerError::NotFound("Endpoint not found".to_owned())
}

/// Client metadata derived from request headers: address, user agent and
/// the coarse location set by the edge network, if any.
pub struct RequestContext(pub ClientContext);

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        let ip = client_ip::resolve(&parts.headers, &parts.extensions, state.settings.trust_proxy);
        Ok(Self(ClientContext {
            ip: (ip != client_ip::UNKNOWN_CLIENT).then_some(ip),
            user_agent: header("user-agent"),
            country: header("x-vercel-ip-country").or_else(|| header("cf-ipcountry")),
            region: header("x-vercel-ip-country-region"),
        }))
    }
}
