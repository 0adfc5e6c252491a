use thiserror::Error;

/// Errors from a tabular store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid store response: {0}")]
    InvalidResponse(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome classes of repository operations that callers branch on.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("delete code is required")]
    MissingCode,

    #[error("analysis not found")]
    RecordNotFound,

    #[error("invalid delete code")]
    InvalidDeleteCode,

    #[error(transparent)]
    Store(#[from] StoreError),
}
