//! Error types for the Exposr client.

use exposr_core::SessionError;
use exposr_intake::IntakeError;
use thiserror::Error;

/// Errors that can occur when using the Exposr client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The file was rejected locally; no request was sent.
    #[error(transparent)]
    Validation(#[from] IntakeError),

    /// Connection error (network failure, DNS resolution, timeout).
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The `error` field of the response body, or the status text.
        message: String,
    },

    /// Response deserialization error.
    #[error("failed to deserialize response: {0}")]
    Deserialization(String),

    /// Client configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The local fallback analysis hit a simulated load failure.
    #[error("{0}")]
    Transient(String),

    #[error("delete code required")]
    MissingCode,

    #[error("analysis not found")]
    RecordNotFound,

    #[error("invalid delete code")]
    InvalidDeleteCode,

    /// The flow was driven out of order.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ClientError {
    /// Returns `true` if repeating the same call may succeed.
    ///
    /// Connection errors, transient fallback failures, 408, 429 and 5xx
    /// responses are retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Transient(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// HTTP status for [`ClientError::Api`] errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ClientError::Connection("reset".into()).is_retryable());
        assert!(ClientError::Transient("busy".into()).is_retryable());
        for status in [408, 429, 500, 503] {
            let err = ClientError::Api {
                status,
                message: String::new(),
            };
            assert!(err.is_retryable(), "{status}");
        }
        for status in [400, 401, 404, 413] {
            let err = ClientError::Api {
                status,
                message: String::new(),
            };
            assert!(!err.is_retryable(), "{status}");
        }
        assert!(!ClientError::RecordNotFound.is_retryable());
        assert!(!ClientError::Validation(IntakeError::Missing).is_retryable());
    }

    #[test]
    fn status_is_exposed_for_api_errors() {
        let err = ClientError::Api {
            status: 413,
            message: "File too large".into(),
        };
        assert_eq!(err.status(), Some(413));
        assert_eq!(err.to_string(), "HTTP 413: File too large");
        assert_eq!(ClientError::MissingCode.status(), None);
    }
}
