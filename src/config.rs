//! Report configuration.
//!
//! Handles loading, validating, and merging `creative-report.toml`. Stock
//! defaults are the base layer; a user file only needs the keys it wants to
//! change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [ingest]
//! max_concurrent_decodes = 4  # Parallel decodes (omit for auto = CPU cores)
//! decode_timeout_secs = 30    # Per-file decode timeout
//!
//! [context]
//! lookup_timeout_secs = 10    # App context lookup timeout
//!
//! [render]
//! engine = "layout"           # "layout" (built in) or "chrome"
//! viewport_width = 1024       # Report width in CSS pixels
//! scale = 2                   # Device pixels per CSS pixel
//! timeout_secs = 60           # Rasterization timeout
//!
//! [page]
//! size = "a4"                 # "a4" or "letter", always portrait
//! break_policy = "legacy"     # "legacy" or "exact"
//!
//! [export]
//! jpeg_quality = 100          # Page image quality (1-100)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Quality, mm_to_px};
use crate::paginate::{PageBreakPolicy, PageGeometry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "creative-report.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Complete configuration for one report session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub ingest: IngestConfig,
    pub context: ContextConfig,
    pub render: RenderConfig,
    pub page: PageConfig,
    pub export: ExportConfig,
}

impl ReportConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.max_concurrent_decodes == Some(0) {
            return Err(ConfigError::Validation(
                "ingest.max_concurrent_decodes must be at least 1".into(),
            ));
        }
        if self.ingest.decode_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "ingest.decode_timeout_secs must be non-zero".into(),
            ));
        }
        if self.context.lookup_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "context.lookup_timeout_secs must be non-zero".into(),
            ));
        }
        if self.render.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "render.timeout_secs must be non-zero".into(),
            ));
        }
        if !(1..=4).contains(&self.render.scale) {
            return Err(ConfigError::Validation("render.scale must be 1-4".into()));
        }
        if !(320..=4096).contains(&self.render.viewport_width) {
            return Err(ConfigError::Validation(
                "render.viewport_width must be 320-4096".into(),
            ));
        }
        if !(1..=100).contains(&self.export.jpeg_quality) {
            return Err(ConfigError::Validation(
                "export.jpeg_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }

    /// Pixel geometry of one output page at the configured render scale.
    pub fn page_geometry(&self) -> PageGeometry {
        let (w_mm, h_mm) = self.page.size.dimensions_mm();
        PageGeometry {
            page_width: mm_to_px(w_mm, self.render.scale),
            page_height: mm_to_px(h_mm, self.render.scale),
        }
    }
}

/// Screenshot ingestion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Maximum number of decodes in flight.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_concurrent_decodes: Option<usize>,
    pub decode_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_decodes: None,
            decode_timeout_secs: 30,
        }
    }
}

impl IngestConfig {
    /// Resolve the effective decode concurrency.
    ///
    /// - `None` → use all available cores
    /// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
    pub fn effective_decoders(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.max_concurrent_decodes
            .map(|n| n.min(cores))
            .unwrap_or(cores)
            .max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    pub lookup_timeout_secs: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_secs: 10,
        }
    }
}

impl ContextConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

/// Which rasterizer turns the report into pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderEngine {
    /// Built-in block layout (no text shaping, no external programs).
    #[default]
    Layout,
    /// Headless Chrome screenshot of the HTML report. Needs the `chrome` feature.
    Chrome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub engine: RenderEngine,
    /// Report width in CSS pixels.
    pub viewport_width: u32,
    /// Device pixels per CSS pixel.
    pub scale: u32,
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            engine: RenderEngine::Layout,
            viewport_width: 1024,
            scale: 2,
            timeout_secs: 60,
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Raster width in device pixels.
    pub fn raster_width(&self) -> u32 {
        self.viewport_width * self.scale
    }
}

/// Physical page size. Pages are always portrait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// (width, height) in millimetres.
    pub fn dimensions_mm(self) -> (f64, f64) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
        }
    }

    /// (width, height) in PDF points (1/72 inch).
    pub fn dimensions_pt(self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        ((w / 25.4 * 72.0) as f32, (h / 25.4 * 72.0) as f32)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
    pub size: PageSize,
    pub break_policy: PageBreakPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub jpeg_quality: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { jpeg_quality: 100 }
    }
}

impl ExportConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.jpeg_quality)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ReportConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ReportConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ReportConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `creative-report.toml` from the given directory, or stock defaults
/// when there is none.
pub fn load_config(dir: &Path) -> Result<ReportConfig, ConfigError> {
    resolve_config(load_raw_config(&dir.join(CONFIG_FILE_NAME))?)
}

/// Load an explicitly named config file. Unlike [`load_config`], a missing
/// file is an error.
pub fn load_config_file(path: &Path) -> Result<ReportConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# creative-report configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Screenshot ingestion
# ---------------------------------------------------------------------------
[ingest]
# Maximum number of screenshots decoded at once.
# Omit to use all CPU cores. Larger values are clamped to the core count.
# max_concurrent_decodes = 4

# A screenshot that takes longer than this to decode is skipped.
decode_timeout_secs = 30

# ---------------------------------------------------------------------------
# App context lookup
# ---------------------------------------------------------------------------
[context]
# After this long the lookup is abandoned and the "not available"
# placeholder context is used instead.
lookup_timeout_secs = 10

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# "layout": built-in block renderer, no external programs.
# "chrome": headless Chrome screenshot of the HTML report
#           (binary must be built with the `chrome` feature).
engine = "layout"

# Width of the rendered report in CSS pixels.
viewport_width = 1024

# Device pixels per CSS pixel. Higher is sharper and larger.
scale = 2

# Rasterization is abandoned after this long and the export fails.
timeout_secs = 60

# ---------------------------------------------------------------------------
# Pages
# ---------------------------------------------------------------------------
[page]
# "a4" or "letter". Pages are always portrait.
size = "a4"

# How the last page is decided when the report height is an exact multiple
# of the page height:
#   "legacy": emit one extra blank trailing page (historical behavior)
#   "exact":  emit exactly ceil(height / page height) pages
break_policy = "legacy"

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# JPEG quality of the page images (1-100).
jpeg_quality = 100
"##
}
