use bytes::Bytes;
use exposr_core::ImageUpload;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::Deserialize;
use tracing::{debug, warn};

/// Knobs for [`Compressor`].
#[derive(Debug, Clone, Deserialize)]
pub struct CompressionPolicy {
    /// Files at or below this many bytes pass through untouched.
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    /// Longest side after downscaling, in pixels.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// First JPEG quality tried (1-100).
    #[serde(default = "default_initial_quality")]
    pub initial_quality: u8,
    #[serde(default = "default_quality_step")]
    pub quality_step: u8,
    /// Lowest JPEG quality tried. Its output is used even if still above
    /// the threshold.
    #[serde(default = "default_min_quality")]
    pub min_quality: u8,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_dimension: default_max_dimension(),
            initial_quality: default_initial_quality(),
            quality_step: default_quality_step(),
            min_quality: default_min_quality(),
        }
    }
}

fn default_threshold() -> usize {
    4 * 1024 * 1024
}

fn default_max_dimension() -> u32 {
    1920
}

fn default_initial_quality() -> u8 {
    80
}

fn default_quality_step() -> u8 {
    10
}

fn default_min_quality() -> u8 {
    10
}

/// What the compressor produced.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub bytes: Bytes,
    pub content_type: String,
    /// `false` when the input was passed through unchanged.
    pub compressed: bool,
    /// JPEG quality of the accepted encoding.
    pub quality: Option<u8>,
}

impl CompressionOutcome {
    fn passthrough(upload: &ImageUpload) -> Self {
        Self {
            bytes: upload.bytes.clone(),
            content_type: upload.content_type.clone(),
            compressed: false,
            quality: None,
        }
    }

    /// Rebuild the upload with the compressed payload, keeping the filename.
    pub fn into_upload(self, filename: impl Into<String>) -> ImageUpload {
        ImageUpload::new(filename, self.content_type, self.bytes)
    }
}

/// Lossy, best-effort shrinking of oversized images.
///
/// Never fails: any decode or encode error yields the original bytes.
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    policy: CompressionPolicy,
}

impl Compressor {
    pub fn new(policy: CompressionPolicy) -> Self {
        Self { policy }
    }

    /// CPU-bound; async callers should run it on a blocking thread.
    pub fn compress(&self, upload: &ImageUpload) -> CompressionOutcome {
        if upload.len() <= self.policy.threshold {
            return CompressionOutcome::passthrough(upload);
        }

        match self.reencode(&upload.bytes) {
            Ok((bytes, quality)) => {
                debug!(
                    original = upload.len(),
                    compressed = bytes.len(),
                    quality,
                    "image compressed"
                );
                CompressionOutcome {
                    bytes: Bytes::from(bytes),
                    content_type: "image/jpeg".to_owned(),
                    compressed: true,
                    quality: Some(quality),
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    filename = %upload.filename,
                    "compression failed, using original"
                );
                CompressionOutcome::passthrough(upload)
            }
        }
    }

    fn reencode(&self, bytes: &[u8]) -> Result<(Vec<u8>, u8), image::ImageError> {
        let mut img = image::load_from_memory(bytes)?;

        let max = self.policy.max_dimension;
        if img.width() > max || img.height() > max {
            img = img.resize(max, max, FilterType::Triangle);
        }
        let rgb = img.to_rgb8();

        let step = self.policy.quality_step.max(1);
        let floor = self.policy.min_quality.clamp(1, 100);
        let mut quality = self.policy.initial_quality.clamp(floor, 100);

        loop {
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;

            if out.len() <= self.policy.threshold || quality == floor {
                return Ok((out, quality));
            }
            quality = quality.saturating_sub(step).max(floor);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbImage};

    use super::*;
    use crate::probe::probe_dimensions;

    /// A noisy PNG that compresses poorly, so it is reliably "oversized".
    fn noisy_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let v = x.wrapping_mul(7919) ^ y.wrapping_mul(104_729) ^ (x * y);
            image::Rgb([(v & 0xFF) as u8, ((v >> 8) & 0xFF) as u8, ((v >> 16) & 0xFF) as u8])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn small_policy(threshold: usize, max_dimension: u32) -> CompressionPolicy {
        CompressionPolicy {
            threshold,
            max_dimension,
            ..CompressionPolicy::default()
        }
    }

    #[test]
    fn below_threshold_passes_through() {
        let upload = ImageUpload::new("a.png", "image/png", noisy_png(8, 8));
        let out = Compressor::default().compress(&upload);
        assert!(!out.compressed);
        assert_eq!(out.bytes, upload.bytes);
        assert_eq!(out.content_type, "image/png");
    }

    #[test]
    fn oversized_image_is_reencoded_as_jpeg() {
        let png = noisy_png(200, 150);
        let threshold = png.len() / 2;
        let upload = ImageUpload::new("a.png", "image/png", png);

        let out = Compressor::new(small_policy(threshold, 1920)).compress(&upload);
        assert!(out.compressed);
        assert_eq!(out.content_type, "image/jpeg");
        assert!(out.bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
        let quality = out.quality.unwrap();
        assert!((10..=80).contains(&quality));
        assert!(out.bytes.len() <= threshold || quality == 10);
    }

    #[test]
    fn longest_side_is_bounded() {
        let upload = ImageUpload::new("wide.png", "image/png", noisy_png(300, 120));
        let out = Compressor::new(small_policy(1, 100)).compress(&upload);
        assert!(out.compressed);
        let (w, h) = probe_dimensions(&out.bytes).unwrap();
        assert_eq!(w, 100);
        assert!(h <= 40);
    }

    #[test]
    fn floor_quality_output_is_returned_even_if_still_large() {
        let upload = ImageUpload::new("a.png", "image/png", noisy_png(64, 64));
        let out = Compressor::new(small_policy(1, 1920)).compress(&upload);
        assert!(out.compressed);
        assert_eq!(out.quality, Some(10));
    }

    #[test]
    fn undecodable_input_falls_back_to_original() {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend(std::iter::repeat_n(0xAB, 64));
        let upload = ImageUpload::new("broken.jpg", "image/jpeg", bytes);
        let out = Compressor::new(small_policy(8, 1920)).compress(&upload);
        assert!(!out.compressed);
        assert_eq!(out.bytes, upload.bytes);
    }
}
