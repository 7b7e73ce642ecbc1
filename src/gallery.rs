//! The ordered screenshot gallery.
//!
//! [`GalleryStore`] is the single owner of every [`GalleryEntry`]. Whatever
//! order decodes finish in, the visible order is always `filename` ascending
//! (plain byte comparison, no locale rules), with duplicates kept in the order
//! they appeared in their batch.
//!
//! ## Batches and generations
//!
//! Ingestion is asynchronous, so a second upload can start before the first
//! one finishes. Each upload takes a [`BatchTicket`] from
//! [`GalleryStore::begin_batch`] *before* decoding and hands it back to
//! [`GalleryStore::commit`] afterwards. Only the most recently issued ticket
//! can commit; older ones are rejected with [`GalleryError::StaleBatch`] and
//! the gallery is left exactly as it was.
//!
//! ```text
//! begin_batch() → #1        begin_batch() → #2
//!      │ decoding…                │ decoding…
//!      │                          └─ commit(#2) ✓  gallery = batch 2
//!      └─ commit(#1) ✗ StaleBatch  gallery unchanged
//! ```
//!
//! ## Change events
//!
//! A store built with [`GalleryStore::with_events`] sends a [`GalleryEvent`]
//! after every mutation. `BecameEmpty` fires on each transition from
//! non-empty to empty, so dependent state (a generated report, an export
//! button) can reset itself.

use crate::types::Bitmap;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GalleryError {
    #[error("batch {ticket} superseded by batch {current}")]
    StaleBatch { ticket: u64, current: u64 },
}

/// Monotonic id assigned when an entry is installed. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InsertionToken(u64);

impl InsertionToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Proof that a batch was started; required to commit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTicket(u64);

impl BatchTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// A decoded image that has not been installed yet.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub filename: String,
    pub bitmap: Bitmap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub filename: String,
    pub bitmap: Bitmap,
    pub token: InsertionToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryEvent {
    Replaced { generation: u64, count: usize },
    Removed { token: InsertionToken, filename: String },
    BecameEmpty,
}

#[derive(Debug, Default)]
pub struct GalleryStore {
    entries: Vec<GalleryEntry>,
    next_token: u64,
    generation: u64,
    events: Option<Sender<GalleryEvent>>,
}

impl GalleryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Sender<GalleryEvent>) -> Self {
        Self {
            events: Some(events),
            ..Self::default()
        }
    }

    /// Start a new batch. Any ticket issued earlier becomes stale.
    pub fn begin_batch(&mut self) -> BatchTicket {
        self.generation += 1;
        BatchTicket(self.generation)
    }

    /// Install a batch if its ticket is still the newest one.
    ///
    /// Returns the number of entries now visible.
    pub fn commit(
        &mut self,
        ticket: BatchTicket,
        images: Vec<DecodedImage>,
    ) -> Result<usize, GalleryError> {
        if ticket.0 != self.generation {
            return Err(GalleryError::StaleBatch {
                ticket: ticket.0,
                current: self.generation,
            });
        }
        Ok(self.install(images))
    }

    /// Replace the whole gallery unconditionally. Also invalidates any
    /// batch still in flight.
    pub fn replace_all(&mut self, images: Vec<DecodedImage>) -> usize {
        self.generation += 1;
        self.install(images)
    }

    fn install(&mut self, mut images: Vec<DecodedImage>) -> usize {
        let was_empty = self.entries.is_empty();
        // Stable: equal names keep their batch order.
        images.sort_by(|a, b| a.filename.cmp(&b.filename));

        self.entries = images
            .into_iter()
            .map(|image| {
                self.next_token += 1;
                GalleryEntry {
                    filename: image.filename,
                    bitmap: image.bitmap,
                    token: InsertionToken(self.next_token),
                }
            })
            .collect();

        let count = self.entries.len();
        self.emit(GalleryEvent::Replaced {
            generation: self.generation,
            count,
        });
        if count == 0 && !was_empty {
            self.emit(GalleryEvent::BecameEmpty);
        }
        count
    }

    /// Remove one entry. Order of the remaining entries is untouched.
    pub fn remove(&mut self, token: InsertionToken) -> Option<GalleryEntry> {
        let index = self.entries.iter().position(|e| e.token == token)?;
        let removed = self.entries.remove(index);
        self.emit(GalleryEvent::Removed {
            token,
            filename: removed.filename.clone(),
        });
        if self.entries.is_empty() {
            self.emit(GalleryEvent::BecameEmpty);
        }
        Some(removed)
    }

    /// The live ordered view. Borrowed, so it cannot outlive the next mutation.
    pub fn current_order(&self) -> &[GalleryEntry] {
        &self.entries
    }

    /// Owned copy of the ordered view; bitmaps are shared, not copied.
    pub fn snapshot(&self) -> Vec<GalleryEntry> {
        self.entries.clone()
    }

    pub fn filenames(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.filename.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn emit(&self, event: GalleryEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver just means nobody is listening anymore.
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use std::sync::mpsc;

    fn decoded(name: &str) -> DecodedImage {
        DecodedImage {
            filename: name.to_string(),
            bitmap: Bitmap::new(DynamicImage::new_rgb8(1, 1)),
        }
    }

    fn batch(names: &[&str]) -> Vec<DecodedImage> {
        names.iter().map(|n| decoded(n)).collect()
    }

    #[test]
    fn replace_all_sorts_by_filename() {
        let mut store = GalleryStore::new();
        store.replace_all(batch(&["c.png", "a.png", "b.png"]));
        assert_eq!(store.filenames(), vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn ordering_is_bytewise_not_locale() {
        let mut store = GalleryStore::new();
        store.replace_all(batch(&["b.png", "B.png", "a.png", "10.png", "9.png"]));
        // ASCII: digits < uppercase < lowercase, and "10" < "9"
        assert_eq!(
            store.filenames(),
            vec!["10.png", "9.png", "B.png", "a.png", "b.png"]
        );
    }

    #[test]
    fn duplicate_names_keep_batch_order() {
        let mut store = GalleryStore::new();
        let mut images = batch(&["dup.png", "a.png", "dup.png"]);
        images[0].bitmap = Bitmap::new(DynamicImage::new_rgb8(1, 1));
        images[2].bitmap = Bitmap::new(DynamicImage::new_rgb8(2, 2));
        store.replace_all(images);

        let order = store.current_order();
        assert_eq!(order[1].filename, "dup.png");
        assert_eq!(order[1].bitmap.dimensions(), (1, 1));
        assert_eq!(order[2].bitmap.dimensions(), (2, 2));
    }

    #[test]
    fn tokens_increase_in_visible_order_and_across_batches() {
        let mut store = GalleryStore::new();
        store.replace_all(batch(&["b.png", "a.png"]));
        let first: Vec<u64> = store.current_order().iter().map(|e| e.token.get()).collect();
        assert_eq!(first, vec![1, 2]);

        store.replace_all(batch(&["z.png"]));
        assert_eq!(store.current_order()[0].token.get(), 3);
    }

    #[test]
    fn batch_replaces_previous_gallery() {
        let mut store = GalleryStore::new();
        store.replace_all(batch(&["a.png", "b.png"]));
        store.replace_all(batch(&["c.png"]));
        assert_eq!(store.filenames(), vec!["c.png"]);
    }

    #[test]
    fn remove_preserves_order() {
        let mut store = GalleryStore::new();
        store.replace_all(batch(&["a.png", "b.png", "c.png"]));
        let middle = store.current_order()[1].token;

        let removed = store.remove(middle).unwrap();
        assert_eq!(removed.filename, "b.png");
        assert_eq!(store.filenames(), vec!["a.png", "c.png"]);
    }

    #[test]
    fn remove_unknown_token_is_none() {
        let mut store = GalleryStore::new();
        store.replace_all(batch(&["a.png"]));
        assert!(store.remove(InsertionToken(99)).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn removing_last_entry_signals_became_empty_once() {
        let (tx, rx) = mpsc::channel();
        let mut store = GalleryStore::with_events(tx);
        store.replace_all(batch(&["a.png", "b.png"]));

        let tokens: Vec<_> = store.current_order().iter().map(|e| e.token).collect();
        for token in tokens {
            store.remove(token);
        }
        // Removing again from an empty gallery must not re-signal.
        assert!(store.remove(InsertionToken(1)).is_none());

        let events: Vec<GalleryEvent> = rx.try_iter().collect();
        let empties = events
            .iter()
            .filter(|e| **e == GalleryEvent::BecameEmpty)
            .count();
        assert_eq!(empties, 1);
        assert_eq!(events.last(), Some(&GalleryEvent::BecameEmpty));
    }

    #[test]
    fn empty_batch_over_populated_gallery_signals_became_empty() {
        let (tx, rx) = mpsc::channel();
        let mut store = GalleryStore::with_events(tx);
        store.replace_all(batch(&["a.png"]));
        store.replace_all(Vec::new());

        let events: Vec<GalleryEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                GalleryEvent::Replaced { generation: 1, count: 1 },
                GalleryEvent::Replaced { generation: 2, count: 0 },
                GalleryEvent::BecameEmpty,
            ]
        );
    }

    #[test]
    fn empty_batch_over_empty_gallery_is_quiet() {
        let (tx, rx) = mpsc::channel();
        let mut store = GalleryStore::with_events(tx);
        store.replace_all(Vec::new());
        let events: Vec<GalleryEvent> = rx.try_iter().collect();
        assert!(!events.contains(&GalleryEvent::BecameEmpty));
    }

    #[test]
    fn newest_ticket_commits() {
        let mut store = GalleryStore::new();
        let ticket = store.begin_batch();
        assert_eq!(store.commit(ticket, batch(&["b.png", "a.png"])), Ok(2));
        assert_eq!(store.filenames(), vec!["a.png", "b.png"]);
    }

    #[test]
    fn stale_ticket_is_rejected_and_gallery_untouched() {
        let mut store = GalleryStore::new();
        let old = store.begin_batch();
        let new = store.begin_batch();

        store.commit(new, batch(&["new.png"])).unwrap();
        let err = store.commit(old, batch(&["old.png"])).unwrap_err();

        assert_eq!(err, GalleryError::StaleBatch { ticket: 1, current: 2 });
        assert_eq!(store.filenames(), vec!["new.png"]);
    }

    #[test]
    fn replace_all_invalidates_in_flight_ticket() {
        let mut store = GalleryStore::new();
        let ticket = store.begin_batch();
        store.replace_all(batch(&["manual.png"]));
        assert!(store.commit(ticket, batch(&["late.png"])).is_err());
        assert_eq!(store.filenames(), vec!["manual.png"]);
    }

    #[test]
    fn dropped_receiver_does_not_break_mutations() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut store = GalleryStore::with_events(tx);
        assert_eq!(store.replace_all(batch(&["a.png"])), 1);
    }
}
