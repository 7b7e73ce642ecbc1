//! Pure calculation functions for image and page dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// CSS reference pixels per inch.
const CSS_PX_PER_INCH: f64 = 96.0;
const MM_PER_INCH: f64 = 25.4;

/// Convert a physical length to device pixels at the given render scale.
///
/// A4 width (210mm) at scale 1 is 794 CSS pixels; at scale 2 it is 1587.
pub fn mm_to_px(mm: f64, scale: u32) -> u32 {
    (mm / MM_PER_INCH * CSS_PX_PER_INCH * scale as f64).round() as u32
}

/// Calculate dimensions that fit entirely inside `bounds` while keeping the
/// source aspect ratio. Never upscales; never returns a zero dimension.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `bounds` - Box to fit inside (width, height)
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;
    if src_w == 0 || src_h == 0 {
        return (1, 1);
    }

    let ratio = (max_w as f64 / src_w as f64)
        .min(max_h as f64 / src_h as f64)
        .min(1.0);
    let w = ((src_w as f64 * ratio).round() as u32).max(1);
    let h = ((src_h as f64 * ratio).round() as u32).max(1);
    (w, h)
}
