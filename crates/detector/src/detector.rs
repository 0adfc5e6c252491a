use async_trait::async_trait;
use exposr_core::{ImageUpload, Verdict};

use crate::error::DetectorError;

/// What a backend concluded about one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub verdict: Verdict,
    /// 0-100.
    pub confidence: u8,
    pub is_ai: bool,
    pub explanation: String,
    pub evidence: Vec<String>,
    /// Backend-specific payload, passed through as `detectionDetails`.
    pub raw: Option<serde_json::Value>,
}

/// Strongly-typed analysis backend with native `async fn`.
///
/// Not object-safe; use [`DynDetector`] behind an `Arc`. Every `Detector`
/// implements `DynDetector` through the blanket implementation below.
pub trait Detector: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Classify `upload`.
    fn detect(
        &self,
        upload: &ImageUpload,
    ) -> impl std::future::Future<Output = Result<Detection, DetectorError>> + Send;
}

/// Object-safe analysis backend for use behind `Arc<dyn DynDetector>`.
#[async_trait]
pub trait DynDetector: Send + Sync {
    fn name(&self) -> &str;

    async fn detect(&self, upload: &ImageUpload) -> Result<Detection, DetectorError>;
}

#[async_trait]
impl<T: Detector + Sync> DynDetector for T {
    fn name(&self) -> &str {
        Detector::name(self)
    }

    async fn detect(&self, upload: &ImageUpload) -> Result<Detection, DetectorError> {
        Detector::detect(self, upload).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct FixedDetector {
        fail: bool,
    }

    impl Detector for FixedDetector {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn detect(&self, _upload: &ImageUpload) -> Result<Detection, DetectorError> {
            if self.fail {
                return Err(DetectorError::Connection("unreachable".into()));
            }
            Ok(Detection {
                verdict: Verdict::AiGenerated,
                confidence: 91,
                is_ai: true,
                explanation: "fixed".into(),
                evidence: Vec::new(),
                raw: None,
            })
        }
    }

    #[tokio::test]
    async fn blanket_impl_dispatches_dynamically() {
        let detectors: Vec<Arc<dyn DynDetector>> = vec![
            Arc::new(FixedDetector { fail: false }),
            Arc::new(FixedDetector { fail: true }),
        ];
        let upload = ImageUpload::new("a.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]);

        let ok = detectors[0].detect(&upload).await.unwrap();
        assert_eq!(ok.confidence, 91);
        assert_eq!(detectors[0].name(), "fixed");

        let err = detectors[1].detect(&upload).await.unwrap_err();
        assert!(err.is_transient());
    }
}
