use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use tracing::error;

use super::{AppState, RequestContext};
use super::schemas::{DashboardResponse, ErrorResponse, LoginRequest, LoginResponse};
use crate::auth::LoginError;
use crate::client_ip;
use crate::error::ServerError;
use crate::ratelimit::middleware::rate_limited_response;

const TOO_MANY_ATTEMPTS_MESSAGE: &str = "Too many authentication attempts, please try again later.";

/// `POST /api/admin/login` -- exchange the admin password for a token.
///
/// Failed attempts are counted per IP; successful ones are not.
#[utoipa::path(
    post,
    path = "/api/admin/login",
    tag = "Admin",
    summary = "Admin login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Password missing", body = ErrorResponse),
        (status = 401, description = "Wrong password", body = ErrorResponse),
        (status = 429, description = "Too many failed attempts", body = ErrorResponse),
        (status = 500, description = "Admin login not configured", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    RequestContext(context): RequestContext,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let ip = context
        .ip
        .unwrap_or_else(|| client_ip::UNKNOWN_CLIENT.to_owned());

    if let Some(limiter) = &state.login_limiter
        && let Err(exceeded) = limiter.peek(&ip)
    {
        tracing::warn!(%ip, "admin login rate limit exceeded");
        return rate_limited_response(&exceeded, TOO_MANY_ATTEMPTS_MESSAGE);
    }

    let password = body
        .ok()
        .and_then(|Json(req)| req.password)
        .unwrap_or_default();

    match state.auth.login(&password) {
        Ok((token, expires_in)) => Json(LoginResponse {
            success: true,
            token,
            expires_in,
        })
        .into_response(),
        Err(e) => {
            if let Some(limiter) = &state.login_limiter {
                limiter.record(&ip);
            }
            login_error(e).into_response()
        }
    }
}

fn login_error(e: LoginError) -> ServerError {
    match e {
        LoginError::MissingPassword => ServerError::BadRequest("Password required".to_owned()),
        LoginError::NotConfigured => {
            ServerError::Internal("Admin authentication not configured".to_owned())
        }
        LoginError::InvalidCredentials => {
            ServerError::Unauthorized("Invalid credentials".to_owned())
        }
        LoginError::Token(msg) => {
            error!(error = %msg, "failed to issue admin token");
            ServerError::Internal("Login failed".to_owned())
        }
    }
}

/// `GET /api/admin/dashboard` -- aggregate statistics.
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "Admin",
    summary = "Dashboard statistics",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Aggregate statistics", body = DashboardResponse),
        (status = 401, description = "Token missing", body = ErrorResponse),
        (status = 403, description = "Token invalid or expired", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ServerError> {
    let stats = state.repository.dashboard().await.map_err(|e| {
        error!(error = %e, "failed to build dashboard");
        ServerError::Internal("Failed to fetch dashboard data".to_owned())
    })?;
    Ok(Json(DashboardResponse {
        success: true,
        data: stats,
    }))
}
