//! Upload intake for Exposr.
//!
//! [`FileValidator`] rejects files before any network call is made, and
//! [`Compressor`] shrinks oversized images on a best-effort basis.

pub mod compress;
pub mod error;
pub mod probe;
pub mod validate;

pub use compress::{CompressionOutcome, CompressionPolicy, Compressor};
pub use error::IntakeError;
pub use probe::probe_dimensions;
pub use validate::{DEFAULT_ALLOWED_TYPES, DEFAULT_MAX_FILE_SIZE, FileValidator, ValidationPolicy};
