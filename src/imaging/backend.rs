//! Image decoding backend trait and its error type.
//!
//! The [`ImageDecoder`] trait is the one seam between ingestion and pixel
//! work. Ingestion runs each call on tokio's blocking pool, so implementations
//! are plain synchronous code and must be `Send + Sync`.
//!
//! The production implementation is
//! [`RustDecoder`](super::rust_backend::RustDecoder).

use crate::types::{Bitmap, SourceFile};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("could not read file: {0}")]
    Unreadable(String),
    #[error("file is empty")]
    Empty,
    #[error("unsupported image format")]
    Unsupported,
    #[error("decode failed: {0}")]
    Corrupt(String),
    #[error("decode timed out after {0:?}")]
    TimedOut(Duration),
    #[error("decoder task failed: {0}")]
    TaskFailed(String),
}

/// Turns raw file bytes into a displayable bitmap.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, file: &SourceFile) -> Result<Bitmap, DecodeError>;
}
