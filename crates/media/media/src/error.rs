use thiserror::Error;

/// Errors from a media host.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("media host returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid media host response: {0}")]
    InvalidResponse(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("media host unavailable: {0}")]
    Unavailable(String),
}
