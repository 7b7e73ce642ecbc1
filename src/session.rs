//! One report-building session: upload, prune, generate, export.
//!
//! [`ReportSession`] owns the gallery and listens to its change events. The
//! generated report is tied to the gallery it was built from: once the last
//! screenshot is removed, the report is dropped and export is refused until
//! a new one is generated.

use crate::config::ReportConfig;
use crate::context::{ContextProvider, resolve_context};
use crate::export::{DocumentExporter, ExportError, ExportedDocument};
use crate::gallery::{GalleryEntry, GalleryEvent, GalleryStore, InsertionToken};
use crate::imaging::ImageDecoder;
use crate::ingest::{ImageIngestor, IngestSummary, read_files};
use crate::raster::Rasterizer;
use crate::report::{Report, ReportError, ReportHeader, generate_report};
use crate::types::SourceFile;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use tracing::debug;

pub struct ReportSession<D> {
    config: ReportConfig,
    store: GalleryStore,
    events: Receiver<GalleryEvent>,
    ingestor: ImageIngestor<D>,
    report: Option<Report>,
}

impl<D> ReportSession<D>
where
    D: ImageDecoder + 'static,
{
    pub fn new(decoder: D, config: ReportConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            ingestor: ImageIngestor::new(decoder, &config.ingest),
            config,
            store: GalleryStore::with_events(tx),
            events: rx,
            report: None,
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Replace the gallery with a freshly decoded batch.
    pub async fn upload(&mut self, files: Vec<SourceFile>) -> IngestSummary {
        let summary = self.ingestor.ingest(&mut self.store, files).await;
        self.apply_events();
        summary
    }

    /// Read screenshots from disk and upload them as one batch. Paths that
    /// cannot be read are listed with the decode failures.
    pub async fn upload_paths(&mut self, paths: &[PathBuf]) -> IngestSummary {
        let (files, unreadable) = read_files(paths).await;
        let mut summary = self.upload(files).await;
        summary.failures.extend(unreadable);
        summary.failures.sort_by(|a, b| a.filename.cmp(&b.filename));
        summary
    }

    /// Delete one screenshot from the gallery.
    pub fn remove(&mut self, token: InsertionToken) -> Option<GalleryEntry> {
        let removed = self.store.remove(token);
        self.apply_events();
        removed
    }

    pub fn gallery(&self) -> &[GalleryEntry] {
        self.store.current_order()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Build a report from the current gallery.
    ///
    /// Fails before any context lookup when the gallery is empty.
    pub async fn generate<P: ContextProvider>(
        &mut self,
        app_name: &str,
        store_url: &str,
        provider: &P,
    ) -> Result<&Report, ReportError> {
        if self.store.is_empty() {
            return Err(ReportError::NoScreenshots);
        }
        let context =
            resolve_context(provider, app_name, self.config.context.lookup_timeout()).await;
        let report = generate_report(
            self.store.current_order(),
            &context,
            ReportHeader::new(app_name, store_url),
        )?;
        debug!(
            sections = report.sections.len(),
            screenshots = report.screenshot_count(),
            "report generated"
        );
        let report: &Report = self.report.insert(report);
        Ok(report)
    }

    /// Exporter configured from this session's settings.
    pub fn exporter(&self) -> DocumentExporter {
        DocumentExporter::from_config(&self.config)
    }

    /// Export the current report to `out_dir`.
    pub async fn export<R: Rasterizer>(
        &self,
        rasterizer: &R,
        out_dir: &Path,
    ) -> Result<ExportedDocument, ExportError> {
        self.export_with(&self.exporter(), rasterizer, out_dir).await
    }

    pub async fn export_with<R: Rasterizer>(
        &self,
        exporter: &DocumentExporter,
        rasterizer: &R,
        out_dir: &Path,
    ) -> Result<ExportedDocument, ExportError> {
        let report = self.report.as_ref().ok_or(ExportError::NoReport)?;
        exporter.export(report, rasterizer, out_dir).await
    }

    fn apply_events(&mut self) {
        for event in self.events.try_iter() {
            if event == GalleryEvent::BecameEmpty && self.report.take().is_some() {
                debug!("gallery emptied, discarding generated report");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoContextProvider;
    use crate::imaging::backend::tests::MockDecoder;
    use crate::raster::LayoutRasterizer;
    use tempfile::TempDir;

    fn files(names: &[&str]) -> Vec<SourceFile> {
        names.iter().map(|n| SourceFile::new(*n, vec![1u8])).collect()
    }

    fn session() -> ReportSession<MockDecoder> {
        ReportSession::new(MockDecoder::new(), ReportConfig::default())
    }

    #[tokio::test]
    async fn generate_requires_screenshots() {
        let mut session = session();
        let err = session
            .generate("Acme", "", &NoContextProvider)
            .await
            .unwrap_err();
        assert_eq!(err, ReportError::NoScreenshots);
        assert!(session.report().is_none());
    }

    #[tokio::test]
    async fn removing_last_screenshot_discards_report() {
        let mut session = session();
        session.upload(files(&["b.png", "a.png"])).await;
        session
            .generate("Acme", "", &NoContextProvider)
            .await
            .unwrap();

        let tokens: Vec<InsertionToken> = session.gallery().iter().map(|e| e.token).collect();
        session.remove(tokens[0]);
        assert!(session.report().is_some());

        session.remove(tokens[1]);
        assert!(session.gallery().is_empty());
        assert!(session.report().is_none());
    }

    #[tokio::test]
    async fn empty_upload_discards_report() {
        let mut session = session();
        session.upload(files(&["a.png"])).await;
        session
            .generate("Acme", "", &NoContextProvider)
            .await
            .unwrap();

        session.upload(Vec::new()).await;
        assert!(session.report().is_none());
    }

    #[tokio::test]
    async fn export_without_report_is_refused() {
        let tmp = TempDir::new().unwrap();
        let session = session();
        let err = session
            .export(&LayoutRasterizer::new(400, 1), tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NoReport));
    }

    #[tokio::test]
    async fn generated_report_follows_gallery_order() {
        let mut session = session();
        session.upload(files(&["c.png", "a.png", "b.png"])).await;
        let report = session
            .generate("Acme", "https://apps.example.com", &NoContextProvider)
            .await
            .unwrap();
        assert_eq!(
            report.sections[1].screenshots,
            vec!["a.png", "b.png", "c.png"]
        );
    }

    #[tokio::test]
    async fn full_session_exports_pdf() {
        let tmp = TempDir::new().unwrap();
        let mut session = session();
        session.upload(files(&["a.png"])).await;
        session
            .generate("Acme", "", &NoContextProvider)
            .await
            .unwrap();

        let doc = session
            .export(&LayoutRasterizer::new(400, 1), tmp.path())
            .await
            .unwrap();
        assert!(doc.page_count >= 1);
        assert!(doc.path.ends_with("Acme_creative_analysis.pdf"));
    }
}
