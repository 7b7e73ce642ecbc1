//! Concurrent screenshot decoding with a fan-in barrier.
//!
//! Every file in a batch is decoded on tokio's blocking pool, at most
//! `max_concurrent` at a time. Results are gathered with `buffer_unordered`,
//! so they arrive in *completion* order. Nothing reaches the gallery until
//! every decode has finished, and the batch is then sorted by
//! `(filename, batch position)`. The visible order is decided by that sort,
//! never by the scheduler.
//!
//! A decode that fails, panics, or exceeds `decode_timeout` is logged and
//! dropped from the batch. The remaining files still go through. Files read
//! from disk with [`read_files`] follow the same rule: one unreadable path
//! becomes a failure entry, not an aborted batch.

use crate::config::IngestConfig;
use crate::gallery::{DecodedImage, GalleryError, GalleryStore};
use crate::imaging::{DecodeError, ImageDecoder};
use crate::types::{Bitmap, SourceFile};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A file that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub filename: String,
    pub error: DecodeError,
}

/// Read every path concurrently. Paths that cannot be read are logged and
/// returned as failures; the files that were read keep their input order.
pub async fn read_files(paths: &[PathBuf]) -> (Vec<SourceFile>, Vec<DecodeFailure>) {
    let reads = futures::future::join_all(paths.iter().map(|p| SourceFile::read(p))).await;

    let mut files = Vec::with_capacity(paths.len());
    let mut failures = Vec::new();
    for (path, read) in paths.iter().zip(reads) {
        match read {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "skipping screenshot that could not be read"
                );
                failures.push(DecodeFailure {
                    filename: display_name(path),
                    error: DecodeError::Unreadable(e.to_string()),
                });
            }
        }
    }
    (files, failures)
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// The fan-in result of one batch: decoded images in final order, plus failures.
#[derive(Debug, Default)]
pub struct DecodedBatch {
    pub images: Vec<DecodedImage>,
    pub failures: Vec<DecodeFailure>,
}

/// What happened to an upload.
#[derive(Debug)]
pub struct IngestSummary {
    pub accepted: usize,
    pub failures: Vec<DecodeFailure>,
    /// A newer upload committed first; this batch was discarded.
    pub superseded: bool,
}

pub struct ImageIngestor<D> {
    decoder: Arc<D>,
    max_concurrent: usize,
    decode_timeout: Duration,
}

impl<D> ImageIngestor<D>
where
    D: ImageDecoder + 'static,
{
    pub fn new(decoder: D, config: &IngestConfig) -> Self {
        Self {
            decoder: Arc::new(decoder),
            max_concurrent: config.effective_decoders(),
            decode_timeout: Duration::from_secs(config.decode_timeout_secs),
        }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Decode a whole batch. Returns only once every file has settled.
    pub async fn decode_batch(&self, files: Vec<SourceFile>) -> DecodedBatch {
        let total = files.len();
        debug!(total, limit = self.max_concurrent, "decoding batch");

        let settled: Vec<(usize, String, Result<Bitmap, DecodeError>)> =
            stream::iter(files.into_iter().enumerate())
                .map(|(position, file)| self.decode_one(position, file))
                .buffer_unordered(self.max_concurrent.max(1))
                .collect()
                .await;

        let mut decoded = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (position, filename, result) in settled {
            match result {
                Ok(bitmap) => decoded.push((position, DecodedImage { filename, bitmap })),
                Err(error) => {
                    warn!(file = %filename, %error, "skipping screenshot that failed to decode");
                    failures.push(DecodeFailure { filename, error });
                }
            }
        }

        decoded.sort_by(|(pa, a), (pb, b)| a.filename.cmp(&b.filename).then(pa.cmp(pb)));
        failures.sort_by(|a, b| a.filename.cmp(&b.filename));

        DecodedBatch {
            images: decoded.into_iter().map(|(_, image)| image).collect(),
            failures,
        }
    }

    async fn decode_one(
        &self,
        position: usize,
        file: SourceFile,
    ) -> (usize, String, Result<Bitmap, DecodeError>) {
        let filename = file.name.clone();
        let decoder = Arc::clone(&self.decoder);
        let task = tokio::task::spawn_blocking(move || decoder.decode(&file));

        let result = match tokio::time::timeout(self.decode_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(DecodeError::TaskFailed(join_error.to_string())),
            Err(_) => Err(DecodeError::TimedOut(self.decode_timeout)),
        };
        (position, filename, result)
    }

    /// Decode a batch and install it as the new gallery.
    ///
    /// The ticket is taken before decoding starts, so if a newer upload
    /// commits while this one is still decoding, this batch is discarded.
    pub async fn ingest(&self, store: &mut GalleryStore, files: Vec<SourceFile>) -> IngestSummary {
        let ticket = store.begin_batch();
        debug!(generation = ticket.generation(), "started batch");
        let batch = self.decode_batch(files).await;
        Self::finish(store, ticket, batch)
    }

    /// Commit a batch decoded earlier with [`decode_batch`](Self::decode_batch).
    pub fn finish(
        store: &mut GalleryStore,
        ticket: crate::gallery::BatchTicket,
        batch: DecodedBatch,
    ) -> IngestSummary {
        match store.commit(ticket, batch.images) {
            Ok(accepted) => IngestSummary {
                accepted,
                failures: batch.failures,
                superseded: false,
            },
            Err(GalleryError::StaleBatch { ticket, current }) => {
                debug!(ticket, current, "discarding superseded batch");
                IngestSummary {
                    accepted: 0,
                    failures: batch.failures,
                    superseded: true,
                }
            }
        }
    }
}
