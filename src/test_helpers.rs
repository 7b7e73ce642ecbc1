//! Shared fixtures for the unit test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let gallery = gallery_of(&["b.png", "a.png"]);
//! assert_eq!(gallery[0].filename, "a.png");
//!
//! let file = SourceFile::new("shot.png", png_bytes(4, 8));
//! ```

use crate::context::{ReportContext, Review};
use crate::gallery::{DecodedImage, GalleryEntry, GalleryStore};
use crate::types::Bitmap;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

// =========================================================================
// Images
// =========================================================================

/// Encoded PNG of a `width` x `height` gradient.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 16 % 256) as u8, (y * 16 % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Solid-colour bitmap, already decoded.
pub fn solid_bitmap(width: u32, height: u32, colour: [u8; 3]) -> Bitmap {
    Bitmap::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        Rgb(colour),
    )))
}

// =========================================================================
// Gallery
// =========================================================================

/// Gallery entries for `names`, sorted exactly as the store would sort them.
pub fn gallery_of(names: &[&str]) -> Vec<GalleryEntry> {
    let mut store = GalleryStore::new();
    store.replace_all(
        names
            .iter()
            .map(|name| DecodedImage {
                filename: name.to_string(),
                bitmap: solid_bitmap(30, 60, [200, 40, 40]),
            })
            .collect(),
    );
    store.snapshot()
}

// =========================================================================
// Context
// =========================================================================

/// A populated context with four features and one review.
pub fn sample_context() -> ReportContext {
    ReportContext {
        description: "Dating app".to_string(),
        category: "Social Networking".to_string(),
        rating: "4.5".to_string(),
        features: vec![
            "Profile customization".to_string(),
            "Matching algorithm".to_string(),
            "In-app messaging".to_string(),
            "Photo sharing".to_string(),
        ],
        reviews: vec![Review {
            title: "Great Experience".to_string(),
            text: "Easy to use and great features".to_string(),
        }],
    }
}
