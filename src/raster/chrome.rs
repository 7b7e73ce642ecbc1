//! Headless Chrome rasterizer.
//!
//! Writes the HTML report to a temporary file, opens it in headless Chrome,
//! measures the document height, then captures the full page as a PNG at the
//! configured device scale. The browser API is blocking, so the whole session
//! runs on tokio's blocking pool.

use super::{RasterDocument, RasterError, Rasterizer};
use crate::config::RenderConfig;
use crate::render::render_report;
use crate::report::Report;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

/// Window height used only to load and measure the document.
const MEASURE_HEIGHT: u32 = 800;

#[derive(Debug, Clone)]
pub struct ChromeRasterizer {
    viewport_width: u32,
    scale: u32,
}

impl ChromeRasterizer {
    pub fn new(viewport_width: u32, scale: u32) -> Self {
        Self {
            viewport_width,
            scale: scale.max(1),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.viewport_width, config.scale)
    }
}

impl Rasterizer for ChromeRasterizer {
    async fn rasterize(&self, report: &Report) -> Result<RasterDocument, RasterError> {
        let html = render_report(report).into_string();
        let mut page = tempfile::Builder::new()
            .prefix("creative-report-")
            .suffix(".html")
            .tempfile()?;
        page.write_all(html.as_bytes())?;
        page.flush()?;

        let url = format!("file://{}", page.path().display());
        let (width, scale) = (self.viewport_width, self.scale);
        let png = tokio::task::spawn_blocking(move || capture(&url, width, scale))
            .await
            .map_err(|e| RasterError::TaskFailed(e.to_string()))??;
        // Keep the HTML file alive until the browser is done with it.
        drop(page);

        let pixels = image::load_from_memory(&png)?.to_rgb8();
        RasterDocument::new(pixels)
    }
}

fn open(url: &str, width: u32, height: u32) -> Result<(Browser, Arc<Tab>), RasterError> {
    let options = LaunchOptions::default_builder()
        .headless(true)
        .window_size(Some((width, height)))
        .build()
        .map_err(|e| RasterError::Browser(format!("launch options: {e}")))?;
    let browser =
        Browser::new(options).map_err(|e| RasterError::Browser(format!("launch: {e}")))?;
    let tab = browser
        .new_tab()
        .map_err(|e| RasterError::Browser(format!("new tab: {e}")))?;
    tab.navigate_to(url)
        .map_err(|e| RasterError::Browser(format!("navigate: {e}")))?
        .wait_until_navigated()
        .map_err(|e| RasterError::Browser(format!("wait for navigation: {e}")))?;
    Ok((browser, tab))
}

fn document_height(tab: &Tab) -> Result<u32, RasterError> {
    let result = tab
        .evaluate("document.documentElement.scrollHeight", false)
        .map_err(|e| RasterError::Browser(format!("measure: {e}")))?;
    result
        .value
        .and_then(|v| v.as_u64())
        .map(|h| h.max(1) as u32)
        .ok_or_else(|| RasterError::Browser("measure: no height returned".into()))
}

fn capture(url: &str, width: u32, scale: u32) -> Result<Vec<u8>, RasterError> {
    let height = {
        let (_browser, tab) = open(url, width, MEASURE_HEIGHT)?;
        document_height(&tab)?
    };
    debug!(width, height, scale, "capturing report in chrome");

    // Reopen with a window tall enough that the whole document is in view.
    let (_browser, tab) = open(url, width, height)?;
    let clip = Page::Viewport {
        x: 0.0,
        y: 0.0,
        width: width as f64,
        height: height as f64,
        scale: scale as f64,
    };
    tab.capture_screenshot(
        Page::CaptureScreenshotFormatOption::Png,
        None,
        Some(clip),
        true,
    )
    .map_err(|e| RasterError::Browser(format!("screenshot: {e}")))
}
