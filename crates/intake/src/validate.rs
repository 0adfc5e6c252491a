use exposr_core::{ImageKind, ImageUpload};
use serde::Deserialize;

use crate::error::IntakeError;

/// Default upload ceiling: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// MIME types accepted unless configured otherwise.
pub const DEFAULT_ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

const MAX_FILENAME_LEN: usize = 255;

/// Bytes read from the head of the file for signature checks.
const SIGNATURE_PREFIX: usize = 12;

/// Limits enforced by [`FileValidator`].
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationPolicy {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_max_file_size() -> usize {
    DEFAULT_MAX_FILE_SIZE
}

fn default_allowed_types() -> Vec<String> {
    DEFAULT_ALLOWED_TYPES.iter().map(|&t| t.to_owned()).collect()
}

/// Checks presence, declared type, size, filename length and magic bytes,
/// in that order.
#[derive(Debug, Clone, Default)]
pub struct FileValidator {
    policy: ValidationPolicy,
}

impl FileValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn max_file_size(&self) -> usize {
        self.policy.max_file_size
    }

    /// Validate `upload`, returning the verified image kind.
    pub fn validate(&self, upload: &ImageUpload) -> Result<ImageKind, IntakeError> {
        if upload.is_empty() {
            return Err(IntakeError::Missing);
        }

        let kind = self.allowed_kind(&upload.content_type)?;

        if upload.len() > self.policy.max_file_size {
            return Err(IntakeError::TooLarge {
                size: upload.len(),
                limit: self.policy.max_file_size,
            });
        }

        if upload.filename.len() > MAX_FILENAME_LEN {
            return Err(IntakeError::FilenameTooLong {
                len: upload.filename.len(),
                limit: MAX_FILENAME_LEN,
            });
        }

        let head = &upload.bytes[..upload.len().min(SIGNATURE_PREFIX)];
        if !kind.matches_signature(head) {
            return Err(IntakeError::SignatureMismatch { declared: kind });
        }

        Ok(kind)
    }

    fn allowed_kind(&self, content_type: &str) -> Result<ImageKind, IntakeError> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        let listed = self
            .policy
            .allowed_types
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(essence));
        match ImageKind::from_mime(essence) {
            Some(kind) if listed => Ok(kind),
            _ => Err(IntakeError::UnsupportedType(content_type.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_HEAD: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];
    const PNG_HEAD: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn upload(mime: &str, bytes: Vec<u8>) -> ImageUpload {
        ImageUpload::new("photo", mime, bytes)
    }

    #[test]
    fn accepts_matching_signatures() {
        let validator = FileValidator::default();
        assert_eq!(
            validator.validate(&upload("image/jpeg", JPEG_HEAD.to_vec())),
            Ok(ImageKind::Jpeg)
        );
        assert_eq!(
            validator.validate(&upload("image/jpg", JPEG_HEAD.to_vec())),
            Ok(ImageKind::Jpeg)
        );
        assert_eq!(
            validator.validate(&upload("image/png", PNG_HEAD.to_vec())),
            Ok(ImageKind::Png)
        );
        let webp = b"RIFF\x24\x00\x00\x00WEBPVP8 ".to_vec();
        assert_eq!(
            validator.validate(&upload("image/webp", webp)),
            Ok(ImageKind::Webp)
        );
    }

    #[test]
    fn empty_file_is_missing() {
        let validator = FileValidator::default();
        assert_eq!(
            validator.validate(&upload("image/png", Vec::new())),
            Err(IntakeError::Missing)
        );
    }

    #[test]
    fn rejects_unlisted_types() {
        let validator = FileValidator::default();
        assert_eq!(
            validator.validate(&upload("image/gif", b"GIF89a".to_vec())),
            Err(IntakeError::UnsupportedType("image/gif".into()))
        );

        let png_only = FileValidator::new(ValidationPolicy {
            allowed_types: vec!["image/png".into()],
            ..ValidationPolicy::default()
        });
        assert!(matches!(
            png_only.validate(&upload("image/jpeg", JPEG_HEAD.to_vec())),
            Err(IntakeError::UnsupportedType(_))
        ));
    }

    #[test]
    fn declared_type_must_match_content() {
        let validator = FileValidator::default();
        assert_eq!(
            validator.validate(&upload("image/png", JPEG_HEAD.to_vec())),
            Err(IntakeError::SignatureMismatch {
                declared: ImageKind::Png
            })
        );
        assert!(matches!(
            validator.validate(&upload("image/jpeg", b"<html>".to_vec())),
            Err(IntakeError::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn size_is_checked_before_content() {
        let validator = FileValidator::new(ValidationPolicy {
            max_file_size: 16,
            ..ValidationPolicy::default()
        });
        // Wrong signature AND too large: size wins.
        let err = validator
            .validate(&upload("image/png", vec![0u8; 17]))
            .unwrap_err();
        assert_eq!(err, IntakeError::TooLarge { size: 17, limit: 16 });
        assert!(err.is_too_large());

        let mut exact = JPEG_HEAD.to_vec();
        exact.resize(16, 0);
        assert!(validator.validate(&upload("image/jpeg", exact)).is_ok());
    }

    #[test]
    fn overlong_filename_is_rejected() {
        let validator = FileValidator::default();
        let upload = ImageUpload::new("a".repeat(256), "image/jpeg", JPEG_HEAD.to_vec());
        assert!(matches!(
            validator.validate(&upload),
            Err(IntakeError::FilenameTooLong { len: 256, .. })
        ));
    }
}
