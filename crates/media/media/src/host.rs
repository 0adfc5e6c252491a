use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::MediaError;

/// An image stored on a media host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Host-side identifier, used for later deletion.
    pub public_id: String,
    /// Public HTTPS URL of the stored image.
    pub secure_url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bytes: Option<u64>,
}

/// Trait for hosting uploaded images.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Store `bytes` under `public_id`.
    ///
    /// The host may namespace the id (for example under a folder); the
    /// returned [`MediaAsset::public_id`] is the one to pass to
    /// [`destroy`](Self::destroy).
    async fn upload(
        &self,
        public_id: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<MediaAsset, MediaError>;

    /// Remove a stored image. Returns `true` if it existed.
    async fn destroy(&self, public_id: &str) -> Result<bool, MediaError>;
}
