//! Slicing one tall report raster into fixed-size pages.
//!
//! The raster is scaled to the page width, keeping its aspect ratio, so its
//! height on the page is `img = page_width * raster_height / raster_width`.
//! Every page shows the *whole* scaled image, shifted up by a whole number of
//! page heights and clipped to the page:
//!
//! ```text
//! page 0   offset     0   ┌──────────┐ ← rows 0 .. ph
//! page 1   offset   -ph   │          │ ← rows ph .. 2ph
//! page 2   offset  -2ph   │          │ ← rows 2ph .. img
//!                         └──────────┘
//! ```
//!
//! ## Where the page loop stops
//!
//! After each page, `height_left` drops by one page height. Under
//! [`PageBreakPolicy::Legacy`] the loop keeps going while
//! `height_left >= 0`, so a report whose height is an exact multiple of the
//! page height gets one extra blank trailing page. This is how exported
//! documents have always looked, so it stays the default.
//! [`PageBreakPolicy::Exact`] uses `height_left > 0` instead and yields exactly
//! `max(1, ceil(img / ph))` pages.
//!
//! All comparisons are done on integers by cross-multiplying with the raster
//! width, so an exact multiple is detected exactly and not lost to float
//! rounding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationError {
    #[error("raster has zero width")]
    EmptyRaster,
    #[error("page geometry {0}x{1} has a zero dimension")]
    EmptyPage(u32, u32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageBreakPolicy {
    /// Continue while the remaining height is `>= 0`.
    #[default]
    Legacy,
    /// Continue while the remaining height is `> 0`.
    Exact,
}

/// Pixel size of one output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub page_width: u32,
    pub page_height: u32,
}

/// Where page `page_index` looks into the scaled image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    pub page_index: usize,
    /// Top of the image relative to the top of the page, in page pixels.
    /// Always `-(page_index * page_height)`.
    pub vertical_offset: i64,
    /// Rows of actual content on this page, in page pixels. Zero on a
    /// trailing blank page.
    pub content_height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    pub geometry: PageGeometry,
    /// Height of the raster once scaled to the page width, in page pixels.
    pub image_height: f64,
    pub placements: Vec<PagePlacement>,
}

impl Pagination {
    pub fn page_count(&self) -> usize {
        self.placements.len()
    }
}

/// Compute page placements for a `raster_width` x `raster_height` raster.
pub fn paginate(
    raster_width: u32,
    raster_height: u32,
    geometry: PageGeometry,
    policy: PageBreakPolicy,
) -> Result<Pagination, PaginationError> {
    if raster_width == 0 {
        return Err(PaginationError::EmptyRaster);
    }
    let PageGeometry {
        page_width,
        page_height,
    } = geometry;
    if page_width == 0 || page_height == 0 {
        return Err(PaginationError::EmptyPage(page_width, page_height));
    }

    // img = pw * H / W. Keep the numerator and compare against k * ph * W.
    let scaled_numerator = page_width as i128 * raster_height as i128;
    let page_step = page_height as i128 * raster_width as i128;
    let image_height = scaled_numerator as f64 / raster_width as f64;

    let remaining_after = |pages: i128| scaled_numerator - pages * page_step;
    let keep_going = |left: i128| match policy {
        PageBreakPolicy::Legacy => left >= 0,
        PageBreakPolicy::Exact => left > 0,
    };

    let mut placements = Vec::new();
    let mut index: usize = 0;
    loop {
        placements.push(placement(index, image_height, page_height));
        index += 1;
        if !keep_going(remaining_after(index as i128)) {
            break;
        }
    }

    Ok(Pagination {
        geometry,
        image_height,
        placements,
    })
}

fn placement(index: usize, image_height: f64, page_height: u32) -> PagePlacement {
    let shown_above = index as f64 * page_height as f64;
    PagePlacement {
        page_index: index,
        vertical_offset: -(index as i64 * page_height as i64),
        content_height: (image_height - shown_above).clamp(0.0, page_height as f64),
    }
}
