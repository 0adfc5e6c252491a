use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use exposr_media::{MediaAsset, MediaError, MediaHost};

#[derive(Debug, Clone)]
struct StoredImage {
    content_type: String,
    bytes: Bytes,
}

/// In-memory [`MediaHost`] backed by a [`DashMap`].
///
/// Ids are namespaced under `folder` the same way the hosted backend does.
/// Failures can be switched on at runtime to exercise error paths.
#[derive(Debug)]
pub struct MemoryMediaHost {
    folder: String,
    images: DashMap<String, StoredImage>,
    fail_uploads: AtomicBool,
    fail_destroys: AtomicBool,
}

impl Default for MemoryMediaHost {
    fn default() -> Self {
        Self::new("exposr")
    }
}

impl MemoryMediaHost {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            images: DashMap::new(),
            fail_uploads: AtomicBool::new(false),
            fail_destroys: AtomicBool::new(false),
        }
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_destroys(&self, fail: bool) {
        self.fail_destroys.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.images.contains_key(public_id)
    }

    /// Stored content type and size of an image, if present.
    pub fn describe(&self, public_id: &str) -> Option<(String, usize)> {
        self.images
            .get(public_id)
            .map(|img| (img.content_type.clone(), img.bytes.len()))
    }

    fn qualify(&self, public_id: &str) -> String {
        if self.folder.is_empty() {
            public_id.to_owned()
        } else {
            format!("{}/{public_id}", self.folder)
        }
    }
}

#[async_trait]
impl MediaHost for MemoryMediaHost {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(
        &self,
        public_id: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<MediaAsset, MediaError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MediaError::Unavailable("uploads disabled".into()));
        }
        let qualified = self.qualify(public_id);
        let size = bytes.len() as u64;
        self.images.insert(
            qualified.clone(),
            StoredImage {
                content_type: content_type.to_owned(),
                bytes,
            },
        );
        Ok(MediaAsset {
            secure_url: format!("memory://{qualified}"),
            public_id: qualified,
            width: None,
            height: None,
            bytes: Some(size),
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<bool, MediaError> {
        if self.fail_destroys.load(Ordering::SeqCst) {
            return Err(MediaError::Unavailable("destroys disabled".into()));
        }
        Ok(self.images.remove(public_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_destroy() {
        let host = MemoryMediaHost::default();
        let asset = host
            .upload("abc123", "image/png", Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap();
        assert_eq!(asset.public_id, "exposr/abc123");
        assert_eq!(asset.secure_url, "memory://exposr/abc123");
        assert_eq!(asset.bytes, Some(4));
        assert_eq!(host.describe("exposr/abc123"), Some(("image/png".into(), 4)));

        assert!(host.destroy(&asset.public_id).await.unwrap());
        assert!(!host.destroy(&asset.public_id).await.unwrap());
        assert!(host.is_empty());
    }

    #[tokio::test]
    async fn failure_toggles() {
        let host = MemoryMediaHost::new("");
        host.set_fail_uploads(true);
        assert!(host.upload("x", "image/png", Bytes::new()).await.is_err());
        host.set_fail_uploads(false);
        let asset = host.upload("x", "image/png", Bytes::new()).await.unwrap();
        assert_eq!(asset.public_id, "x");

        host.set_fail_destroys(true);
        assert!(host.destroy("x").await.is_err());
        assert!(host.contains("x"));
    }
}
