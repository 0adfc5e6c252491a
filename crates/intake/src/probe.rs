use std::io::Cursor;

use image::ImageReader;

/// Read pixel width and height from the image header without decoding the
/// pixel data. Returns `None` for anything the decoder does not recognize.
pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
