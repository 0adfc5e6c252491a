use std::fmt;

use serde::{Deserialize, Serialize};

/// Image container formats accepted for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    /// Resolve a declared MIME type. `image/jpg` is accepted as an alias of
    /// `image/jpeg`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Canonical MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Upper-case label reported as the file format of an analysis.
    pub fn label(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Webp => "WEBP",
        }
    }

    /// Check the leading bytes of `bytes` against this format's signature.
    ///
    /// WebP files must carry both the `RIFF` container tag and the `WEBP`
    /// form type at offset 8.
    pub fn matches_signature(self, bytes: &[u8]) -> bool {
        match self {
            Self::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            Self::Png => bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
            Self::Webp => bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP"),
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpg_is_an_alias_for_jpeg() {
        assert_eq!(ImageKind::from_mime("image/jpg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_mime("IMAGE/JPEG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_mime("image/gif"), None);
    }

    #[test]
    fn mime_parameters_are_ignored() {
        assert_eq!(
            ImageKind::from_mime("image/png; charset=binary"),
            Some(ImageKind::Png)
        );
    }

    #[test]
    fn webp_requires_form_type() {
        let mut webp = b"RIFF\x00\x00\x00\x00WEBPVP8 ".to_vec();
        assert!(ImageKind::Webp.matches_signature(&webp));
        webp[8..12].copy_from_slice(b"WAVE");
        assert!(!ImageKind::Webp.matches_signature(&webp));
    }

    #[test]
    fn short_input_never_matches() {
        assert!(!ImageKind::Jpeg.matches_signature(&[0xFF, 0xD8]));
        assert!(!ImageKind::Webp.matches_signature(b"RIFF"));
    }
}
