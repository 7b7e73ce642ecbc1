//! Image decoding — pure Rust, zero external dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Sniff format** | `image::guess_format` (magic bytes, not the file extension) |
//! | **Decode** | `image::load_from_memory_with_format` |
//! | **Grid thumbnails** | `image::imageops::resize` with `Lanczos3` |
//! | **Page raster encode** | `image::codecs::jpeg::JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Encoding parameters ([`Quality`])
//! - **Backend**: [`ImageDecoder`] trait + [`RustDecoder`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{DecodeError, ImageDecoder};
pub use calculations::{calculate_fit_dimensions, mm_to_px};
pub use params::Quality;
pub use rust_backend::{RustDecoder, is_supported_path, supported_input_extensions};
