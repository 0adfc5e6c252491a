use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use exposr_intake::IntakeError;
use exposr_store::RepositoryError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while starting the server or answering a request.
///
/// The `String` payloads of request-level variants are shown to the caller
/// verbatim, so they must never carry backend details. Those are logged
/// where the error is produced.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input, rejected upload, bad identifier.
    #[error("{0}")]
    BadRequest(String),

    /// The upload exceeds the configured size limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Missing or wrong credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Presented token is invalid or expired.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The analysis backend did not answer within the configured timeout.
    #[error("{0}")]
    Timeout(String),

    /// Rate limit exceeded.
    #[error("{message}")]
    RateLimited {
        /// Seconds until the caller can retry.
        retry_after: u64,
        message: String,
    },

    /// A backend (detector, store, media host) failed.
    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<IntakeError> for ServerError {
    fn from(e: IntakeError) -> Self {
        match e {
            IntakeError::Missing => Self::BadRequest("No image file provided".to_owned()),
            IntakeError::TooLarge { limit, .. } => Self::PayloadTooLarge(format!(
                "File too large - maximum size is {}MB",
                limit / (1024 * 1024)
            )),
            other => Self::BadRequest(capitalize(&other.to_string())),
        }
    }
}

impl From<RepositoryError> for ServerError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::MissingCode => Self::BadRequest("Delete code required".to_owned()),
            RepositoryError::RecordNotFound => Self::NotFound("Analysis not found".to_owned()),
            RepositoryError::InvalidDeleteCode => {
                Self::Unauthorized("Invalid delete code".to_owned())
            }
            RepositoryError::Store(err) => {
                tracing::error!(error = %err, "store failure during delete");
                Self::Internal("Failed to delete analysis".to_owned())
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, retry_after) = match self {
            Self::Config(_) | Self::Io(_) => ("Internal server error".to_owned(), None),
            Self::RateLimited {
                retry_after,
                message,
            } => (message, Some(retry_after)),
            Self::BadRequest(m)
            | Self::PayloadTooLarge(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Timeout(m)
            | Self::Internal(m) => (m, None),
        };

        let body = if let Some(retry) = retry_after {
            serde_json::json!({ "success": false, "error": message, "retryAfter": retry })
        } else {
            serde_json::json!({ "success": false, "error": message })
        };

        let mut response = (status, axum::Json(body)).into_response();

        if let Some(retry) = retry_after {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        response
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use exposr_core::ImageKind;

    use super::*;

    async fn body_json(err: ServerError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn intake_errors_map_to_client_errors() {
        let (status, body) = body_json(IntakeError::Missing.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No image file provided");
        assert_eq!(body["success"], false);

        let (status, body) = body_json(
            IntakeError::TooLarge {
                size: 11 * 1024 * 1024,
                limit: 10 * 1024 * 1024,
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "File too large - maximum size is 10MB");

        let (status, body) = body_json(
            IntakeError::SignatureMismatch {
                declared: ImageKind::Png,
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("File content"));
    }

    #[tokio::test]
    async fn repository_errors_map_to_delete_statuses() {
        assert_eq!(
            ServerError::from(RepositoryError::MissingCode).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(RepositoryError::RecordNotFound).status(),
            StatusCode::NOT_FOUND
        );
        let (status, body) = body_json(RepositoryError::InvalidDeleteCode.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid delete code");
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after() {
        let response = ServerError::RateLimited {
            retry_after: 42,
            message: "slow down".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "42");
    }

    #[tokio::test]
    async fn startup_errors_do_not_leak_details() {
        let (status, body) =
            body_json(ServerError::Config("secret path /etc/exposr".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
