//! Pure Rust decoding backend built on the `image` crate.
//!
//! The format is sniffed from the magic bytes, so a PNG named `shot.jpg`
//! still decodes. Extensions only matter when the CLI walks a directory and
//! has to decide which files are worth reading at all.

use super::backend::{DecodeError, ImageDecoder};
use crate::types::{Bitmap, SourceFile};
use image::ImageFormat;
use std::path::Path;
use std::sync::LazyLock;

const SCREENSHOT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("png", ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    SCREENSHOT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Case-insensitive extension check against [`supported_input_extensions`].
pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RustDecoder;

impl RustDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ImageDecoder for RustDecoder {
    fn decode(&self, file: &SourceFile) -> Result<Bitmap, DecodeError> {
        if file.is_empty() {
            return Err(DecodeError::Empty);
        }
        let format = image::guess_format(&file.bytes).map_err(|_| DecodeError::Unsupported)?;
        if !format.reading_enabled() {
            return Err(DecodeError::Unsupported);
        }
        let decoded = image::load_from_memory_with_format(&file.bytes, format)
            .map_err(|e| DecodeError::Corrupt(e.to_string()))?;
        Ok(Bitmap::new(decoded))
    }
}
