pub mod error;
pub mod host;

pub use error::MediaError;
pub use host::{MediaAsset, MediaHost};
