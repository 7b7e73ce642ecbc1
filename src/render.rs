//! HTML rendering of a synthesized report.
//!
//! Produces one self-contained document: the stylesheet is inlined and every
//! screenshot is embedded as a base64 PNG data URI, so the file can be opened
//! from anywhere or handed to a headless browser without a server.
//!
//! Static assets are embedded at compile time:
//! - `static/report.css`: report layout and typography
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.

use crate::report::{Block, ListItem, Report, ReportSection, ScreenshotRef, SectionKind};
use crate::types::Bitmap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use maud::{DOCTYPE, Markup, html};
use std::io::Cursor;
use std::path::Path;
use tracing::warn;

const CSS: &str = include_str!("../static/report.css");

/// Date format used for timestamp blocks.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Render the full report document.
pub fn render_report(report: &Report) -> Markup {
    let title = format!("{} Creative Analysis", report.header.app_name);
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (CSS) }
            }
            body {
                main.report {
                    @for section in &report.sections {
                        (render_section(section))
                    }
                }
            }
        }
    }
}

/// Render and write the report to `path`.
pub fn write_html(report: &Report, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, render_report(report).into_string())
}

fn render_section(section: &ReportSection) -> Markup {
    let class = match section.kind {
        SectionKind::Header => "report-header",
        SectionKind::ScreenshotGrid => "screenshots",
        SectionKind::VisualAnalysis => "visual-analysis",
        SectionKind::BestPractices => "best-practices",
        SectionKind::Recommendations => "recommendations",
    };
    html! {
        section class=(class) {
            @match section.kind {
                SectionKind::Header => {
                    h2 { (section.title) }
                    dl.header-fields {
                        @for block in &section.blocks {
                            (render_block(block))
                        }
                    }
                }
                _ => {
                    h3 { (section.title) }
                    @for block in &section.blocks {
                        (render_block(block))
                    }
                }
            }
        }
    }
}

fn render_block(block: &Block) -> Markup {
    match block {
        Block::Field { label, value } => html! {
            dt { (label) }
            dd { (value) }
        },
        Block::Timestamp { label, value } => html! {
            dt { (label) }
            dd { time datetime=(value.to_rfc3339()) { (value.format(DATE_FORMAT)) } }
        },
        Block::Paragraph { text } => html! { p { (text) } },
        Block::List { ordered, items } => {
            if *ordered {
                html! { ol { @for item in items { (render_item(item)) } } }
            } else {
                html! { ul { @for item in items { (render_item(item)) } } }
            }
        }
        Block::Grid { screenshots } => html! {
            div.screenshot-grid {
                @for shot in screenshots {
                    (render_tile(shot))
                }
            }
        },
        Block::Subsection { title, blocks } => html! {
            div.panel {
                h4 { (title) }
                @for block in blocks {
                    (render_block(block))
                }
            }
        },
    }
}

fn render_item(item: &ListItem) -> Markup {
    html! {
        li class=[item.emphasized.then_some("emphasized")] {
            @if let Some(lead) = &item.lead {
                strong { (lead) } ": "
            }
            (item.text)
            @if !item.children.is_empty() {
                ul {
                    @for child in &item.children {
                        (render_item(child))
                    }
                }
            }
        }
    }
}

fn render_tile(shot: &ScreenshotRef) -> Markup {
    html! {
        figure {
            @if let Some(src) = data_uri(&shot.bitmap) {
                img src=(src) alt=(shot.filename);
            }
            figcaption { (shot.caption) }
        }
    }
}

/// PNG data URI for a bitmap, or `None` if it could not be encoded.
pub fn data_uri(bitmap: &Bitmap) -> Option<String> {
    let mut png = Cursor::new(Vec::new());
    if let Err(error) = bitmap.image().write_to(&mut png, ImageFormat::Png) {
        warn!(%error, "could not embed screenshot");
        return None;
    }
    Some(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(png.into_inner())
    ))
}
