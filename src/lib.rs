//! # Creative Report
//!
//! Turns a batch of app store screenshots into a creative-analysis report
//! and exports it as a paginated PDF. The screenshots are the data source:
//! their file names decide the order, the app's store context fills in the
//! commentary, and the output is one document per app.
//!
//! # Architecture: Five-Stage Pipeline
//!
//! ```text
//! 1. Ingest     files          →  decoded batch      (concurrent, then sorted)
//! 2. Gallery    decoded batch  →  ordered entries    (single owner, events)
//! 3. Report     entries + ctx  →  report sections    (pure transform)
//! 4. Raster     sections       →  one tall bitmap    (layout engine or Chrome)
//! 5. Export     bitmap         →  <app>_creative_analysis.pdf
//! ```
//!
//! Each stage has a narrow input and output, so the interesting logic
//! (ordering, section wording, page breaks) is tested without decoding real
//! images or launching a browser.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`ingest`] | Stage 1 — concurrent decode with a fan-in barrier and a per-file timeout |
//! | [`gallery`] | Stage 2 — the ordered store, batch generations, change events |
//! | [`report`] | Stage 3 — synthesizes report sections from gallery + context |
//! | [`context`] | App context lookup with a guaranteed fallback record |
//! | [`render`] | HTML rendering of a report using Maud |
//! | [`raster`] | Stage 4 — [`raster::Rasterizer`] trait, built-in layout engine, optional Chrome |
//! | [`paginate`] | Slices the raster into page placements |
//! | [`export`] | Stage 5 — JPEG XObject PDF writer with atomic output |
//! | [`session`] | Wires the stages together for one app |
//! | [`config`] | `creative-report.toml` loading, merging and validation |
//! | [`types`] | Shared handles: [`types::SourceFile`], [`types::Bitmap`] |
//! | [`naming`] | Export file naming and sanitizing |
//! | [`imaging`] | Pure-Rust decoding and dimension math |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Order Comes From a Sort, Not From the Scheduler
//!
//! Decodes finish in whatever order the blocking pool gets to them. Nothing
//! is shown until the whole batch has settled, and then the batch is sorted
//! by file name (byte order, ties broken by upload position). Two runs over
//! the same files always produce the same gallery and the same report.
//!
//! ## Newest Upload Wins
//!
//! Every upload takes a generation ticket before it starts decoding. A batch
//! whose ticket is no longer current when it finishes is dropped, so a slow
//! earlier upload can never overwrite a faster later one.
//!
//! ## Context Never Blocks a Report
//!
//! Store context comes from an outside source that may be slow or missing.
//! The lookup has a timeout and any failure is replaced by a fixed fallback
//! record, which the report renders like real data.
//!
//! ## Structured Sections, Pluggable Rendering
//!
//! [`report::synthesize`] returns data, not markup. The HTML view, the
//! built-in rasterizer and the CLI outline all read the same sections.
//!
//! ## One Image, Many Pages
//!
//! The raster is JPEG-encoded once and referenced from every page. Each page
//! shifts the image up by whole page heights and clips to its own box. The
//! page-break rule is documented in [`paginate`]; by default a report whose
//! height is an exact multiple of the page height keeps a trailing blank
//! page, matching documents exported before the rule was made configurable.

pub mod config;
pub mod context;
pub mod export;
pub mod gallery;
pub mod imaging;
pub mod ingest;
pub mod naming;
pub mod output;
pub mod paginate;
pub mod raster;
pub mod render;
pub mod report;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
