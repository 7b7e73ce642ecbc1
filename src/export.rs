//! PDF export of a generated report.
//!
//! ## Pipeline
//!
//! ```text
//! Report ─rasterize─▶ RasterDocument ─paginate─▶ placements
//!                          │                          │
//!                          └── JPEG (encoded once) ───┴─▶ one PDF page per placement
//! ```
//!
//! The raster is embedded a single time as DCT-compressed image XObjects,
//! one per band of at most 65535 rows (the JPEG size limit). Every page
//! draws the bands it overlaps, scaled to the page width and shifted up by
//! its placement offset, with a clip to the page box. A 3-page export
//! therefore costs one image, not three.
//!
//! Points per page pixel are fixed by the paper width, and the page height
//! in points follows the pixel geometry, so each page shows exactly the
//! rows its placement names.
//!
//! ## Output
//!
//! `<out_dir>/<app>_creative_analysis.pdf`, written to a temporary file in
//! `out_dir` and renamed into place. A failed export leaves nothing behind.

use crate::config::{PageSize, ReportConfig};
use crate::imaging::Quality;
use crate::naming::export_file_name;
use crate::paginate::{PageBreakPolicy, PageGeometry, Pagination, PaginationError, paginate};
use crate::raster::{RasterDocument, RasterError, Rasterizer};
use crate::report::Report;
use image::codecs::jpeg::JpegEncoder;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

/// JPEG caps each side at 65535 pixels, so taller rasters are split.
const MAX_STRIP_ROWS: u32 = u16::MAX as u32;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no report has been generated")]
    NoReport,
    #[error("rasterization failed: {0}")]
    Raster(#[from] RasterError),
    #[error("rasterization timed out after {0:?}")]
    TimedOut(Duration),
    #[error("pagination failed: {0}")]
    Pagination(#[from] PaginationError),
    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not move document into place: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("export task failed: {0}")]
    TaskFailed(String),
}

impl ExportError {
    /// The single message shown to the user for any export failure.
    pub fn user_message(&self) -> &'static str {
        "There was an error generating the PDF. Please try again."
    }
}

/// A PDF that was written successfully.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub path: PathBuf,
    pub page_count: usize,
    pub pagination: Pagination,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct DocumentExporter {
    page_size: PageSize,
    geometry: PageGeometry,
    policy: PageBreakPolicy,
    quality: Quality,
    render_timeout: Duration,
}

impl DocumentExporter {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            page_size: config.page.size,
            geometry: config.page_geometry(),
            policy: config.page.break_policy,
            quality: config.export.quality(),
            render_timeout: config.render.timeout(),
        }
    }

    /// Override the pixel page geometry used for pagination.
    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// Rasterize, paginate and write `report` into `out_dir`.
    pub async fn export<R: Rasterizer>(
        &self,
        report: &Report,
        rasterizer: &R,
        out_dir: &Path,
    ) -> Result<ExportedDocument, ExportError> {
        let raster = tokio::time::timeout(self.render_timeout, rasterizer.rasterize(report))
            .await
            .map_err(|_| ExportError::TimedOut(self.render_timeout))??;
        debug!(
            width = raster.width(),
            height = raster.height(),
            "report rasterized"
        );

        let pagination = paginate(raster.width(), raster.height(), self.geometry, self.policy)?;
        let path = out_dir.join(export_file_name(&report.header.app_name));

        let job = PdfJob {
            raster,
            pagination: pagination.clone(),
            page_pt: self.page_size.dimensions_pt(),
            quality: self.quality,
        };
        let target = path.clone();
        let dir = out_dir.to_path_buf();
        let bytes = tokio::task::spawn_blocking(move || job.write_atomically(&dir, &target))
            .await
            .map_err(|e| ExportError::TaskFailed(e.to_string()))??;

        info!(
            path = %path.display(),
            pages = pagination.page_count(),
            bytes,
            "exported report"
        );
        Ok(ExportedDocument {
            path,
            page_count: pagination.page_count(),
            pagination,
            bytes,
        })
    }
}

/// Everything needed to produce the PDF bytes, owned so it can move to the
/// blocking pool.
struct PdfJob {
    raster: RasterDocument,
    pagination: Pagination,
    page_pt: (f32, f32),
    quality: Quality,
}

impl PdfJob {
    fn write_atomically(self, dir: &Path, target: &Path) -> Result<u64, ExportError> {
        std::fs::create_dir_all(dir)?;
        let document = self.build()?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&document)?;
        tmp.as_file().sync_all()?;
        tmp.persist(target)?;
        Ok(document.len() as u64)
    }

    /// JPEG-encode the raster as horizontal strips, top to bottom.
    fn encode_strips(&self) -> Result<Vec<Strip>, ExportError> {
        let pixels = self.raster.pixels();
        let (width, height) = pixels.dimensions();
        let mut strips = Vec::new();
        let mut top = 0;
        while top < height {
            let rows = (height - top).min(MAX_STRIP_ROWS);
            let view = image::imageops::crop_imm(pixels, 0, top, width, rows).to_image();
            let mut jpeg = Vec::new();
            JpegEncoder::new_with_quality(&mut jpeg, self.quality.value()).encode_image(&view)?;
            strips.push(Strip { top, rows, jpeg });
            top += rows;
        }
        Ok(strips)
    }

    fn build(&self) -> Result<Vec<u8>, ExportError> {
        let strips = self.encode_strips()?;
        let geometry = self.pagination.geometry;
        let raster_width = self.raster.width() as f32;
        // One scale for everything: the page width in points over the page
        // width in pixels. The page height follows the geometry, not the paper.
        let (page_w, _) = self.page_pt;
        let pt_per_px = page_w / geometry.page_width as f32;
        let page_h = geometry.page_height as f32 * pt_per_px;
        let pt_per_row = page_w / raster_width;
        let rows_per_px = raster_width as f64 / geometry.page_width as f64;

        let mut pdf = Pdf::new();
        let mut next_id = 1;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };
        let catalog_ref = alloc();
        let tree_ref = alloc();
        pdf.catalog(catalog_ref).pages(tree_ref);

        let names: Vec<String> = (0..strips.len()).map(|i| format!("Strip{i}")).collect();
        let mut strip_refs = Vec::with_capacity(strips.len());
        for strip in &strips {
            let image_ref = alloc();
            strip_refs.push(image_ref);
            let mut image = pdf.image_xobject(image_ref, &strip.jpeg);
            image.filter(Filter::DctDecode);
            image.width(self.raster.width() as i32);
            image.height(strip.rows as i32);
            image.color_space().device_rgb();
            image.bits_per_component(8);
            image.finish();
        }

        let mut page_refs = Vec::with_capacity(self.pagination.page_count());
        for placement in &self.pagination.placements {
            let page_ref = alloc();
            let content_ref = alloc();
            page_refs.push(page_ref);

            // Raster rows this page looks at.
            let window_top = -placement.vertical_offset as f64 * rows_per_px;
            let window_bottom = window_top + geometry.page_height as f64 * rows_per_px;
            let visible: Vec<usize> = strips
                .iter()
                .enumerate()
                .filter(|(_, s)| {
                    (s.top as f64) < window_bottom && ((s.top + s.rows) as f64) > window_top
                })
                .map(|(i, _)| i)
                .collect();

            let mut page = pdf.page(page_ref);
            page.media_box(Rect::new(0.0, 0.0, page_w, page_h));
            page.parent(tree_ref);
            page.contents(content_ref);
            let mut resources = page.resources();
            let mut x_objects = resources.x_objects();
            for &i in &visible {
                x_objects.pair(Name(names[i].as_bytes()), strip_refs[i]);
            }
            x_objects.finish();
            resources.finish();
            page.finish();

            // Top of the image sits `offset` below the top of the page; PDF
            // space grows upwards from the bottom edge.
            let offset = placement.vertical_offset as f32 * pt_per_px;
            let mut content = Content::new();
            content.save_state();
            content.rect(0.0, 0.0, page_w, page_h);
            content.clip_nonzero();
            content.end_path();
            for &i in &visible {
                let strip = &strips[i];
                let strip_h = strip.rows as f32 * pt_per_row;
                let strip_top = offset + strip.top as f32 * pt_per_row;
                content.save_state();
                content.transform([
                    page_w,
                    0.0,
                    0.0,
                    strip_h,
                    0.0,
                    page_h - (strip_top + strip_h),
                ]);
                content.x_object(Name(names[i].as_bytes()));
                content.restore_state();
            }
            content.restore_state();
            pdf.stream(content_ref, &content.finish());
        }

        let count = page_refs.len() as i32;
        pdf.pages(tree_ref).kids(page_refs).count(count);
        Ok(pdf.finish())
    }
}

/// One JPEG-encoded band of the raster, `rows` tall, starting at row `top`.
struct Strip {
    top: u32,
    rows: u32,
    jpeg: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportHeader, generate_report};
    use crate::test_helpers::{gallery_of, sample_context};
    use image::{Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    struct FixedRasterizer {
        width: u32,
        height: u32,
    }

    impl Rasterizer for FixedRasterizer {
        async fn rasterize(&self, _report: &Report) -> Result<RasterDocument, RasterError> {
            RasterDocument::new(RgbImage::from_pixel(
                self.width,
                self.height,
                Rgb([240, 240, 240]),
            ))
        }
    }

    struct FailingRasterizer;

    impl Rasterizer for FailingRasterizer {
        async fn rasterize(&self, _report: &Report) -> Result<RasterDocument, RasterError> {
            Err(RasterError::Browser("renderer crashed".into()))
        }
    }

    struct StalledRasterizer;

    impl Rasterizer for StalledRasterizer {
        async fn rasterize(&self, _report: &Report) -> Result<RasterDocument, RasterError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(RasterError::Empty)
        }
    }

    fn report(app: &str) -> Report {
        generate_report(
            &gallery_of(&["b.png", "a.png"]),
            &sample_context(),
            ReportHeader::new(app, "https://apps.example.com"),
        )
        .unwrap()
    }

    fn exporter() -> DocumentExporter {
        DocumentExporter::from_config(&ReportConfig::default()).with_geometry(PageGeometry {
            page_width: 1000,
            page_height: 1000,
        })
    }

    fn page_objects(pdf: &[u8]) -> usize {
        pdf.windows(b"/MediaBox".len())
            .filter(|w| *w == b"/MediaBox")
            .count()
    }

    /// Every `a b c d e f cm` operator in the document, in order.
    fn transforms(pdf: &[u8]) -> Vec<[f32; 6]> {
        String::from_utf8_lossy(pdf)
            .lines()
            .filter_map(|line| line.strip_suffix(" cm"))
            .filter_map(|ops| {
                let nums: Vec<f32> = ops.split(' ').filter_map(|n| n.parse().ok()).collect();
                <[f32; 6]>::try_from(nums).ok()
            })
            .collect()
    }

    /// Height of every page's MediaBox, in points.
    fn page_heights(pdf: &[u8]) -> Vec<f32> {
        let text = String::from_utf8_lossy(pdf);
        text.match_indices("/MediaBox [")
            .filter_map(|(at, m)| {
                let rest = &text[at + m.len()..];
                let end = rest.find(']')?;
                rest[..end].split(' ').nth(3)?.parse().ok()
            })
            .collect()
    }

    fn count(pdf: &[u8], needle: &[u8]) -> usize {
        pdf.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn job(width: u32, height: u32, geometry: PageGeometry) -> PdfJob {
        PdfJob {
            raster: RasterDocument::new(RgbImage::from_pixel(width, height, Rgb([0, 0, 0])))
                .unwrap(),
            pagination: paginate(width, height, geometry, PageBreakPolicy::Legacy).unwrap(),
            page_pt: PageSize::A4.dimensions_pt(),
            quality: Quality::new(90),
        }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn tall_raster_becomes_three_pages() {
        let tmp = TempDir::new().unwrap();
        let raster = FixedRasterizer {
            width: 1000,
            height: 2600,
        };

        let doc = exporter()
            .export(&report("Acme"), &raster, tmp.path())
            .await
            .unwrap();

        assert_eq!(doc.page_count, 3);
        let offsets: Vec<i64> = doc
            .pagination
            .placements
            .iter()
            .map(|p| p.vertical_offset)
            .collect();
        assert_eq!(offsets, vec![0, -1000, -2000]);

        let bytes = fs::read(&doc.path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(page_objects(&bytes), 3);
        assert_eq!(doc.bytes, bytes.len() as u64);
    }

    #[tokio::test]
    async fn file_is_named_after_app() {
        let tmp = TempDir::new().unwrap();
        let raster = FixedRasterizer {
            width: 100,
            height: 100,
        };
        let doc = exporter()
            .export(&report("Acme"), &raster, tmp.path())
            .await
            .unwrap();
        assert_eq!(doc.path, tmp.path().join("Acme_creative_analysis.pdf"));
        assert_eq!(dir_entries(tmp.path()), vec!["Acme_creative_analysis.pdf"]);
    }

    #[tokio::test]
    async fn exact_page_multiple_keeps_trailing_page_by_default() {
        let tmp = TempDir::new().unwrap();
        let raster = FixedRasterizer {
            width: 1000,
            height: 2000,
        };
        let doc = exporter()
            .export(&report("Acme"), &raster, tmp.path())
            .await
            .unwrap();
        assert_eq!(doc.page_count, 3);
    }

    #[tokio::test]
    async fn raster_failure_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let err = exporter()
            .export(&report("Acme"), &FailingRasterizer, tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Raster(_)));
        assert_eq!(
            err.user_message(),
            "There was an error generating the PDF. Please try again."
        );
        assert!(dir_entries(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn stalled_rasterizer_times_out() {
        let tmp = TempDir::new().unwrap();
        let err = exporter()
            .with_render_timeout(Duration::from_millis(50))
            .export(&report("Acme"), &StalledRasterizer, tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::TimedOut(_)));
        assert!(dir_entries(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn missing_out_dir_is_created() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("nested/out");
        let raster = FixedRasterizer {
            width: 10,
            height: 10,
        };
        let doc = exporter()
            .export(&report("Acme"), &raster, &out)
            .await
            .unwrap();
        assert!(doc.path.starts_with(&out));
        assert!(doc.path.exists());
    }

    #[test]
    fn jpeg_is_embedded_once() {
        let job = PdfJob {
            raster: RasterDocument::new(RgbImage::from_pixel(50, 500, Rgb([0, 0, 0]))).unwrap(),
            pagination: paginate(
                50,
                500,
                PageGeometry {
                    page_width: 50,
                    page_height: 100,
                },
                PageBreakPolicy::Exact,
            )
            .unwrap(),
            page_pt: PageSize::A4.dimensions_pt(),
            quality: Quality::new(90),
        };
        let pdf = job.build().unwrap();
        assert_eq!(count(&pdf, b"/DCTDecode"), 1);
        assert_eq!(page_objects(&pdf), 5);
    }

    // =========================================================================
    // Page windows
    // =========================================================================

    #[test]
    fn each_page_shows_the_rows_of_its_placement() {
        let geometry = PageGeometry {
            page_width: 1000,
            page_height: 1000,
        };
        let pdf = job(1000, 2600, geometry).build().unwrap();

        let heights = page_heights(&pdf);
        let ops = transforms(&pdf);
        assert_eq!(heights.len(), 3);
        assert_eq!(ops.len(), 3);

        for (index, (page_h, cm)) in heights.iter().zip(&ops).enumerate() {
            let pt_per_row = cm[0] / 1000.0;
            // Raster row at the top edge of the page.
            let first_row = (cm[5] + cm[3] - page_h) / pt_per_row;
            let rows_shown = page_h / pt_per_row;
            assert!((first_row - index as f32 * 1000.0).abs() < 0.5, "page {index}: {first_row}");
            assert!((rows_shown - 1000.0).abs() < 0.5, "page {index}: {rows_shown}");
        }
    }

    #[test]
    fn page_box_follows_paper_for_stock_geometry() {
        let config = ReportConfig::default();
        let geometry = config.page_geometry();
        let pdf = job(geometry.page_width, 100, geometry).build().unwrap();
        let (_, paper_h) = PageSize::A4.dimensions_pt();
        assert!((page_heights(&pdf)[0] - paper_h).abs() < 1.0);
    }

    // =========================================================================
    // Rasters beyond the JPEG size limit
    // =========================================================================

    #[tokio::test]
    async fn raster_taller_than_jpeg_limit_exports_in_strips() {
        let tmp = TempDir::new().unwrap();
        let raster = FixedRasterizer {
            width: 4,
            height: 70_000,
        };
        let doc = DocumentExporter::from_config(&ReportConfig::default())
            .with_geometry(PageGeometry {
                page_width: 4,
                page_height: 10_000,
            })
            .export(&report("Acme"), &raster, tmp.path())
            .await
            .unwrap();

        // 70000 is an exact multiple of the page height: trailing blank page.
        assert_eq!(doc.page_count, 8);
        let pdf = fs::read(&doc.path).unwrap();
        assert_eq!(count(&pdf, b"/DCTDecode"), 2);
        // Pages 0-5 draw the first strip, page 6 straddles both, page 7 is blank.
        assert_eq!(transforms(&pdf).len(), 8);
        assert_eq!(count(&pdf, b"/Strip1 Do"), 1);
    }
}
