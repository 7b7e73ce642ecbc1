//! Built-in block layout renderer.
//!
//! Lays the report out top to bottom in a single column, the way the HTML
//! view stacks its sections, and paints it onto an RGB canvas. There is no
//! font engine: each run of text becomes a grey bar as long as the text
//! would be, wrapped at the column width. Screenshots are drawn for real.
//!
//! Layout happens in two passes. The first walks the blocks and records draw
//! operations with absolute positions, which also yields the total height.
//! The second allocates the canvas once and paints the operations in order.
//! All sizes below are CSS pixels, multiplied by the render scale.

use super::{RasterDocument, RasterError, Rasterizer};
use crate::config::RenderConfig;
use crate::imaging::calculate_fit_dimensions;
use crate::render::DATE_FORMAT;
use crate::report::{Block, ListItem, Report, ReportSection, ScreenshotRef, SectionKind};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use rayon::prelude::*;
use tracing::debug;

const MARGIN: u32 = 32;
const LINE: u32 = 24;
const CHAR_WIDTH: u32 = 8;
const TEXT_BAR: u32 = 10;
const HEADING_BAR: u32 = 16;
const PANEL_PAD: u32 = 16;
const GAP: u32 = 16;
const INDENT: u32 = 20;
const BULLET: u32 = 6;
const GRID_COLUMNS: u32 = 4;
const THUMB_MAX_HEIGHT: u32 = 320;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const PANEL: Rgb<u8> = Rgb([249, 250, 251]);
const RULE: Rgb<u8> = Rgb([229, 231, 235]);
const HEADING: Rgb<u8> = Rgb([31, 41, 55]);
const BODY: Rgb<u8> = Rgb([107, 114, 128]);
const MUTED: Rgb<u8> = Rgb([156, 163, 175]);

#[derive(Debug, Clone)]
pub struct LayoutRasterizer {
    viewport_width: u32,
    scale: u32,
}

impl LayoutRasterizer {
    pub fn new(viewport_width: u32, scale: u32) -> Self {
        Self {
            viewport_width: viewport_width.max(1),
            scale: scale.max(1),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.viewport_width, config.scale)
    }
}

impl Rasterizer for LayoutRasterizer {
    async fn rasterize(&self, report: &Report) -> Result<RasterDocument, RasterError> {
        let report = report.clone();
        let (viewport_width, scale) = (self.viewport_width, self.scale);
        let pixels = tokio::task::spawn_blocking(move || paint(&report, viewport_width, scale))
            .await
            .map_err(|e| RasterError::TaskFailed(e.to_string()))?;
        RasterDocument::new(pixels)
    }
}

// ============================================================================
// Pass 1: layout
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Op {
    Fill {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        colour: Rgb<u8>,
    },
    Thumb {
        x: u32,
        y: u32,
        index: usize,
    },
}

struct Layout {
    scale: u32,
    ops: Vec<Op>,
    thumbs: Vec<RgbImage>,
    y: u32,
}

impl Layout {
    fn px(&self, css: u32) -> u32 {
        css * self.scale
    }

    fn fill(&mut self, x: u32, y: u32, w: u32, h: u32, colour: Rgb<u8>) {
        self.ops.push(Op::Fill { x, y, w, h, colour });
    }

    /// Lay out a run of `chars` characters starting at `x`, wrapping at `width`.
    fn text(&mut self, x: u32, width: u32, chars: usize, bar: u32, colour: Rgb<u8>) {
        let line = self.px(LINE);
        let bar = self.px(bar);
        let per_line = (width / self.px(CHAR_WIDTH)).max(1) as usize;
        let mut left = chars;
        while left > 0 {
            let run = left.min(per_line);
            let w = run as u32 * self.px(CHAR_WIDTH);
            self.fill(x, self.y + (line - bar) / 2, w, bar, colour);
            self.y += line;
            left -= run;
        }
    }

    fn paragraph(&mut self, x: u32, width: u32, text: &str) {
        self.text(x, width, text.chars().count(), TEXT_BAR, BODY);
    }

    fn heading(&mut self, x: u32, width: u32, text: &str) {
        self.text(x, width, text.chars().count(), HEADING_BAR, HEADING);
        self.y += self.px(GAP) / 2;
    }

    fn section(&mut self, x: u32, width: u32, section: &ReportSection) {
        self.heading(x, width, &section.title);
        for block in &section.blocks {
            self.block(x, width, block);
        }
        if section.kind == SectionKind::Header {
            self.fill(x, self.y + self.px(GAP) / 2, width, self.scale, RULE);
        }
        self.y += self.px(GAP) * 2;
    }

    fn block(&mut self, x: u32, width: u32, block: &Block) {
        match block {
            Block::Field { label, value } => self.field(x, width, label, value),
            Block::Timestamp { label, value } => {
                let value = value.format(DATE_FORMAT).to_string();
                self.field(x, width, label, &value);
            }
            Block::Paragraph { text } => self.paragraph(x, width, text),
            Block::List { items, .. } => self.list(x, width, items),
            Block::Grid { screenshots } => self.grid(x, width, screenshots),
            Block::Subsection { title, blocks } => self.panel(x, width, title, blocks),
        }
    }

    fn field(&mut self, x: u32, width: u32, label: &str, value: &str) {
        let label_width = self.px(CHAR_WIDTH) * 16;
        let top = self.y;
        self.text(x, label_width, label.chars().count(), TEXT_BAR, HEADING);
        let label_bottom = self.y;
        self.y = top;
        let value_x = x + label_width + self.px(GAP);
        self.text(
            value_x,
            width.saturating_sub(label_width + self.px(GAP)),
            value.chars().count(),
            TEXT_BAR,
            BODY,
        );
        self.y = self.y.max(label_bottom);
    }

    fn list(&mut self, x: u32, width: u32, items: &[ListItem]) {
        let indent = self.px(INDENT);
        for item in items {
            let bullet = self.px(BULLET);
            self.fill(
                x + (indent - bullet) / 2,
                self.y + (self.px(LINE) - bullet) / 2,
                bullet,
                bullet,
                MUTED,
            );
            let chars = item.lead.as_ref().map(|l| l.chars().count() + 2).unwrap_or(0)
                + item.text.chars().count();
            let (bar, colour) = if item.emphasized {
                (HEADING_BAR, HEADING)
            } else {
                (TEXT_BAR, BODY)
            };
            self.text(x + indent, width.saturating_sub(indent), chars, bar, colour);
            if !item.children.is_empty() {
                self.list(x + indent, width.saturating_sub(indent), &item.children);
            }
        }
        self.y += self.px(GAP) / 2;
    }

    /// A titled panel. The background is inserted beneath its contents once
    /// the contents' height is known.
    fn panel(&mut self, x: u32, width: u32, title: &str, blocks: &[Block]) {
        let pad = self.px(PANEL_PAD);
        let first_op = self.ops.len();
        let top = self.y;
        self.y += pad;
        let inner_width = width.saturating_sub(pad * 2);
        self.heading(x + pad, inner_width, title);
        for block in blocks {
            self.block(x + pad, inner_width, block);
        }
        self.y += pad;
        self.ops.insert(
            first_op,
            Op::Fill {
                x,
                y: top,
                w: width,
                h: self.y - top,
                colour: PANEL,
            },
        );
        self.y += self.px(GAP);
    }

    fn grid(&mut self, x: u32, width: u32, screenshots: &[ScreenshotRef]) {
        let gap = self.px(GAP);
        let tile_width = (width.saturating_sub(gap * (GRID_COLUMNS - 1)) / GRID_COLUMNS).max(1);
        let bounds = (tile_width, self.px(THUMB_MAX_HEIGHT));

        let first_thumb = self.thumbs.len();
        let thumbs: Vec<RgbImage> = screenshots
            .par_iter()
            .map(|shot| {
                let (w, h) = calculate_fit_dimensions(shot.bitmap.dimensions(), bounds);
                imageops::resize(&shot.bitmap.image().to_rgb8(), w, h, FilterType::Lanczos3)
            })
            .collect();
        self.thumbs.extend(thumbs);

        for (row, chunk) in screenshots.chunks(GRID_COLUMNS as usize).enumerate() {
            let row_start = first_thumb + row * GRID_COLUMNS as usize;
            let row_height = (row_start..row_start + chunk.len())
                .map(|i| self.thumbs[i].height())
                .max()
                .unwrap_or(0);
            let top = self.y;
            for (col, shot) in chunk.iter().enumerate() {
                let index = row_start + col;
                let tile_x = x + col as u32 * (tile_width + gap);
                let thumb_width = self.thumbs[index].width();
                self.ops.push(Op::Thumb {
                    x: tile_x + (tile_width - thumb_width) / 2,
                    y: top,
                    index,
                });
                self.y = top + row_height + self.px(GAP) / 2;
                let caption = shot.caption.chars().count() as u32 * self.px(CHAR_WIDTH);
                let caption = caption.min(tile_width);
                self.fill(
                    tile_x + (tile_width - caption) / 2,
                    self.y + (self.px(LINE) - self.px(TEXT_BAR)) / 2,
                    caption,
                    self.px(TEXT_BAR),
                    MUTED,
                );
            }
            self.y = top + row_height + self.px(GAP) / 2 + self.px(LINE) + gap;
        }
    }
}

// ============================================================================
// Pass 2: paint
// ============================================================================

fn paint(report: &Report, viewport_width: u32, scale: u32) -> RgbImage {
    let width = viewport_width * scale;
    let mut layout = Layout {
        scale,
        ops: Vec::new(),
        thumbs: Vec::new(),
        y: MARGIN * scale,
    };
    let margin = layout.px(MARGIN);
    let column = width.saturating_sub(margin * 2).max(1);
    for section in &report.sections {
        layout.section(margin, column, section);
    }
    let height = layout.y + margin;
    debug!(width, height, ops = layout.ops.len(), "laid out report");

    let mut canvas = RgbImage::from_pixel(width, height, WHITE);
    for op in &layout.ops {
        match *op {
            Op::Fill { x, y, w, h, colour } => {
                for py in y..(y + h).min(height) {
                    for px in x..(x + w).min(width) {
                        canvas.put_pixel(px, py, colour);
                    }
                }
            }
            Op::Thumb { x, y, index } => {
                imageops::overlay(&mut canvas, &layout.thumbs[index], x as i64, y as i64);
            }
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ReportContext;
    use crate::report::{ReportHeader, generate_report};
    use crate::test_helpers::{gallery_of, sample_context};

    fn report(names: &[&str]) -> Report {
        generate_report(
            &gallery_of(names),
            &sample_context(),
            ReportHeader::new("Acme", "https://apps.example.com/acme"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn raster_width_is_viewport_times_scale() {
        let raster = LayoutRasterizer::new(640, 2)
            .rasterize(&report(&["a.png"]))
            .await
            .unwrap();
        assert_eq!(raster.width(), 1280);
        assert!(raster.height() > 0);
    }

    #[tokio::test]
    async fn more_screenshots_make_a_taller_raster() {
        let rasterizer = LayoutRasterizer::new(640, 1);
        let one = rasterizer.rasterize(&report(&["a.png"])).await.unwrap();
        let six = rasterizer
            .rasterize(&report(&["1.png", "2.png", "3.png", "4.png", "5.png", "6.png"]))
            .await
            .unwrap();
        assert!(six.height() > one.height());
    }

    #[tokio::test]
    async fn screenshots_are_painted() {
        let raster = LayoutRasterizer::new(640, 1)
            .rasterize(&report(&["a.png", "b.png"]))
            .await
            .unwrap();
        // gallery_of uses solid (200, 40, 40) screenshots
        let red = raster
            .pixels()
            .pixels()
            .filter(|p| p.0[0] > 180 && p.0[1] < 60 && p.0[2] < 60)
            .count();
        assert!(red > 0);
    }

    #[test]
    fn layout_is_deterministic() {
        let r = report(&["a.png", "b.png"]);
        assert_eq!(paint(&r, 400, 1), paint(&r, 400, 1));
    }

    #[test]
    fn scale_multiplies_height() {
        let r = generate_report(
            &gallery_of(&["a.png"]),
            &ReportContext::fallback(),
            ReportHeader::new("Acme", ""),
        )
        .unwrap();
        let one = paint(&r, 500, 1);
        let two = paint(&r, 500, 2);
        assert_eq!(two.width(), one.width() * 2);
        assert!(two.height() > one.height());
    }

    #[test]
    fn long_text_wraps_onto_more_lines() {
        let mut short = Layout {
            scale: 1,
            ops: Vec::new(),
            thumbs: Vec::new(),
            y: 0,
        };
        short.paragraph(0, 400, "short");
        let mut long = Layout {
            scale: 1,
            ops: Vec::new(),
            thumbs: Vec::new(),
            y: 0,
        };
        long.paragraph(0, 400, &"x".repeat(200));
        assert_eq!(short.y, LINE);
        assert_eq!(long.y, LINE * 4);
    }
}
