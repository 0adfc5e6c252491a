use std::time::Duration;

use thiserror::Error;

/// Errors from an analysis backend.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// The backend answered with a non-success status.
    #[error("analysis backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend did not answer in time.
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),

    /// A network or transport-level error occurred.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend rejected the request due to rate limiting.
    #[error("rate limited by analysis backend")]
    RateLimited,

    /// The backend answered with a body we could not interpret.
    #[error("invalid analysis response: {0}")]
    InvalidResponse(String),

    /// The backend is misconfigured (missing key, bad URL).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Synthetic load failure raised by the simulated backend.
    #[error("{0}")]
    Transient(String),
}

impl DetectorError {
    /// Whether a manual retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) | Self::RateLimited | Self::Transient(_) => {
                true
            }
            Self::Status { status, .. } => *status >= 500,
            Self::InvalidResponse(_) | Self::Configuration(_) => false,
        }
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Connection(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(DetectorError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(DetectorError::Connection("reset".into()).is_transient());
        assert!(DetectorError::RateLimited.is_transient());
        assert!(DetectorError::Transient("busy".into()).is_transient());
        assert!(
            DetectorError::Status {
                status: 503,
                body: "loading".into()
            }
            .is_transient()
        );
        assert!(
            !DetectorError::Status {
                status: 400,
                body: String::new()
            }
            .is_transient()
        );
        assert!(!DetectorError::InvalidResponse("x".into()).is_transient());
        assert!(!DetectorError::Configuration("x".into()).is_transient());
    }

    #[test]
    fn display() {
        let err = DetectorError::Status {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(
            err.to_string(),
            "analysis backend returned HTTP 502: bad gateway"
        );
        assert_eq!(
            DetectorError::Timeout(Duration::from_millis(250)).to_string(),
            "analysis timed out after 250ms"
        );
    }
}
