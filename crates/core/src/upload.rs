use bytes::Bytes;

use crate::consent::ConsentFlags;
use crate::image_kind::ImageKind;

/// An uploaded image file as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    /// MIME type declared by the caller, not yet verified.
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Declared kind, if the declared MIME type is one we know.
    pub fn declared_kind(&self) -> Option<ImageKind> {
        ImageKind::from_mime(&self.content_type)
    }

    /// Size rounded to the nearest KiB.
    pub fn size_kb(&self) -> u64 {
        (self.bytes.len() as u64 + 512) / 1024
    }
}

/// One analysis submission: the file plus the uploader's consent flags.
/// Discarded when the request completes.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub upload: ImageUpload,
    pub consent: ConsentFlags,
}

impl AnalysisRequest {
    pub fn new(upload: ImageUpload, consent: ConsentFlags) -> Self {
        Self { upload, consent }
    }
}
