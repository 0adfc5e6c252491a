use exposr_core::ImageKind;
use thiserror::Error;

/// Reasons an upload is rejected before analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("no image file provided")]
    Missing,

    #[error("unsupported file type: {0}. Please upload JPEG, PNG, or WebP images")]
    UnsupportedType(String),

    #[error("file too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("file content does not match declared type {declared}")]
    SignatureMismatch { declared: ImageKind },

    #[error("filename too long: {len} bytes exceeds the {limit} byte limit")]
    FilenameTooLong { len: usize, limit: usize },
}

impl IntakeError {
    /// Whether this rejection is due to size rather than content.
    pub fn is_too_large(&self) -> bool {
        matches!(self, Self::TooLarge { .. })
    }
}
