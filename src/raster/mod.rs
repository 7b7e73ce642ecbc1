//! Turning a report into one tall bitmap.
//!
//! The exporter does not care how the pixels are produced; it only needs a
//! single [`RasterDocument`] to slice into pages. Two engines exist:
//!
//! | Engine | Type | Notes |
//! |---|---|---|
//! | `layout` | [`LayoutRasterizer`] | Pure Rust block layout on `image`. Text runs are drawn as bars |
//! | `chrome` | `ChromeRasterizer` | Full-page screenshot of the HTML report. `chrome` feature |

#[cfg(feature = "chrome")]
mod chrome;
mod layout;

#[cfg(feature = "chrome")]
pub use chrome::ChromeRasterizer;
pub use layout::LayoutRasterizer;

use crate::report::Report;
use image::RgbImage;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("report produced an empty raster")]
    Empty,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("render task failed: {0}")]
    TaskFailed(String),
}

/// The rendered report: one immutable RGB bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterDocument {
    pixels: RgbImage,
}

impl RasterDocument {
    pub fn new(pixels: RgbImage) -> Result<Self, RasterError> {
        if pixels.width() == 0 {
            return Err(RasterError::Empty);
        }
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Rendering collaborator used by the exporter.
pub trait Rasterizer {
    fn rasterize(
        &self,
        report: &Report,
    ) -> impl Future<Output = Result<RasterDocument, RasterError>> + Send;
}
