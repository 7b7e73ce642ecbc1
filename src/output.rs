//! CLI output formatting for each command.
//!
//! # Information-First Display
//!
//! Screenshots are always shown with their positional index in the gallery,
//! the same number the report uses in its captions, followed by the file name.
//! Secondary detail (dimensions, failures, page offsets) goes on indented
//! context lines.
//!
//! # Output Format
//!
//! ## Check / upload
//!
//! ```text
//! Screenshots
//! 001 a.png (1170x2532)
//! 002 b.png (1170x2532)
//!
//! Skipped
//!     broken.png: corrupt image: ...
//!
//! Loaded 2 screenshots, skipped 1
//! ```
//!
//! ## Report
//!
//! ```text
//! Acme Creative Analysis
//!     App Store URL: https://apps.example.com/acme
//!     Report Date: 2026-10-15
//! Screenshots (2)
//!     001 a.png
//!     002 b.png
//! Visual Analysis
//!     Screenshot 1 Analysis
//!     Screenshot 2 Analysis
//! ...
//! Fingerprint: 3f1c9a0b2d4e
//! ```
//!
//! ## Export
//!
//! ```text
//! Exported 3 pages → out/Acme_creative_analysis.pdf
//!     001 offset 0
//!     002 offset -2245
//!     003 offset -4490
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::export::ExportedDocument;
use crate::gallery::GalleryEntry;
use crate::ingest::IngestSummary;
use crate::render::DATE_FORMAT;
use crate::report::{Block, Report, SectionKind};

/// Characters of the fingerprint shown in summaries.
const FINGERPRINT_PREFIX: usize = 12;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Ingest
// ============================================================================

/// Format the gallery after an upload, plus any files that were skipped.
/// Progress line printed before screenshots are read from disk.
pub fn format_reading_header(count: usize) -> String {
    format!("==> Reading {}", plural(count, "file", "files"))
}

pub fn format_ingest_output(summary: &IngestSummary, gallery: &[GalleryEntry]) -> Vec<String> {
    let mut lines = Vec::new();

    if summary.superseded {
        lines.push("Upload superseded by a newer batch; gallery unchanged".to_string());
        return lines;
    }

    lines.push("Screenshots".to_string());
    for (i, entry) in gallery.iter().enumerate() {
        let (w, h) = entry.bitmap.dimensions();
        lines.push(format!("{} {} ({}x{})", format_index(i + 1), entry.filename, w, h));
    }

    if !summary.failures.is_empty() {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        for failure in &summary.failures {
            lines.push(format!("{}{}: {}", indent(1), failure.filename, failure.error));
        }
    }

    lines.push(String::new());
    let mut total = format!("Loaded {}", plural(summary.accepted, "screenshot", "screenshots"));
    if !summary.failures.is_empty() {
        total.push_str(&format!(", skipped {}", summary.failures.len()));
    }
    lines.push(total);
    lines
}

pub fn print_ingest_output(summary: &IngestSummary, gallery: &[GalleryEntry]) {
    for line in format_ingest_output(summary, gallery) {
        println!("{}", line);
    }
}

// ============================================================================
// Report
// ============================================================================

/// Format a report outline: section titles with their first level of detail.
pub fn format_report_output(report: &Report) -> Vec<String> {
    let mut lines = Vec::new();

    for section in &report.sections {
        match section.kind {
            SectionKind::Header => {
                lines.push(format!("{} Creative Analysis", report.header.app_name));
                for block in &section.blocks {
                    match block {
                        Block::Field { label, value } if label != "App Name" => {
                            lines.push(format!("{}{}: {}", indent(1), label, value));
                        }
                        Block::Timestamp { label, value } => {
                            lines.push(format!(
                                "{}{}: {}",
                                indent(1),
                                label,
                                value.format(DATE_FORMAT)
                            ));
                        }
                        _ => {}
                    }
                }
            }
            SectionKind::ScreenshotGrid => {
                lines.push(format!("{} ({})", section.title, section.screenshots.len()));
                for (i, name) in section.screenshots.iter().enumerate() {
                    lines.push(format!("{}{} {}", indent(1), format_index(i + 1), name));
                }
            }
            _ => {
                lines.push(section.title.clone());
                for block in &section.blocks {
                    if let Block::Subsection { title, .. } = block {
                        lines.push(format!("{}{}", indent(1), title));
                    }
                }
            }
        }
    }

    let fingerprint = report.fingerprint();
    lines.push(format!(
        "Fingerprint: {}",
        &fingerprint[..FINGERPRINT_PREFIX.min(fingerprint.len())]
    ));
    lines
}

pub fn print_report_output(report: &Report) {
    for line in format_report_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Export
// ============================================================================

/// Format the result of a PDF export, one line per page.
pub fn format_export_output(doc: &ExportedDocument) -> Vec<String> {
    let mut lines = vec![format!(
        "Exported {} \u{2192} {}",
        plural(doc.page_count, "page", "pages"),
        doc.path.display()
    )];
    for placement in &doc.pagination.placements {
        let mut line = format!(
            "{}{} offset {}",
            indent(1),
            format_index(placement.page_index + 1),
            placement.vertical_offset
        );
        if placement.content_height == 0.0 {
            line.push_str(" (blank)");
        }
        lines.push(line);
    }
    lines
}

pub fn print_export_output(doc: &ExportedDocument) {
    for line in format_export_output(doc) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::DecodeError;
    use crate::ingest::DecodeFailure;
    use crate::paginate::{PageBreakPolicy, PageGeometry, paginate};
    use crate::report::{ReportHeader, generate_report};
    use crate::test_helpers::{gallery_of, sample_context};
    use std::path::PathBuf;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads_to_three() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "page", "pages"), "1 page");
        assert_eq!(plural(0, "page", "pages"), "0 pages");
        assert_eq!(plural(3, "page", "pages"), "3 pages");
    }

    // =========================================================================
    // Ingest
    // =========================================================================

    #[test]
    fn reading_header_pluralizes() {
        assert_eq!(format_reading_header(1), "==> Reading 1 file");
        assert_eq!(format_reading_header(4), "==> Reading 4 files");
    }

    #[test]
    fn ingest_lists_gallery_in_order() {
        let gallery = gallery_of(&["b.png", "a.png"]);
        let summary = IngestSummary {
            accepted: 2,
            failures: Vec::new(),
            superseded: false,
        };
        let lines = format_ingest_output(&summary, &gallery);
        assert_eq!(
            lines,
            vec![
                "Screenshots",
                "001 a.png (30x60)",
                "002 b.png (30x60)",
                "",
                "Loaded 2 screenshots",
            ]
        );
    }

    #[test]
    fn ingest_reports_skipped_files() {
        let gallery = gallery_of(&["a.png"]);
        let summary = IngestSummary {
            accepted: 1,
            failures: vec![DecodeFailure {
                filename: "broken.png".to_string(),
                error: DecodeError::Unsupported,
            }],
            superseded: false,
        };
        let lines = format_ingest_output(&summary, &gallery);
        assert!(lines.contains(&"Skipped".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("    broken.png: ")));
        assert_eq!(lines.last().unwrap(), "Loaded 1 screenshot, skipped 1");
    }

    #[test]
    fn superseded_upload_says_so() {
        let summary = IngestSummary {
            accepted: 0,
            failures: Vec::new(),
            superseded: true,
        };
        let lines = format_ingest_output(&summary, &[]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("superseded"));
    }

    // =========================================================================
    // Report
    // =========================================================================

    #[test]
    fn report_outline_follows_sections() {
        let report = generate_report(
            &gallery_of(&["b.png", "a.png"]),
            &sample_context(),
            ReportHeader::new("Acme", "https://apps.example.com/acme"),
        )
        .unwrap();
        let lines = format_report_output(&report);

        assert_eq!(lines[0], "Acme Creative Analysis");
        assert!(lines.contains(&"    App Store URL: https://apps.example.com/acme".to_string()));
        let grid = lines.iter().position(|l| l == "Screenshots (2)").unwrap();
        assert_eq!(lines[grid + 1], "    001 a.png");
        assert_eq!(lines[grid + 2], "    002 b.png");
        assert!(lines.contains(&"    Screenshot 2 Analysis".to_string()));
        assert!(lines.contains(&"    Action Items Priority".to_string()));

        let last = lines.last().unwrap();
        assert!(last.starts_with("Fingerprint: "));
        assert_eq!(last.len(), "Fingerprint: ".len() + FINGERPRINT_PREFIX);
    }

    // =========================================================================
    // Export
    // =========================================================================

    #[test]
    fn export_lists_pages_and_marks_blank_trailer() {
        let pagination = paginate(
            1000,
            2000,
            PageGeometry {
                page_width: 1000,
                page_height: 1000,
            },
            PageBreakPolicy::Legacy,
        )
        .unwrap();
        let doc = ExportedDocument {
            path: PathBuf::from("out/Acme_creative_analysis.pdf"),
            page_count: pagination.page_count(),
            pagination,
            bytes: 1024,
        };
        let lines = format_export_output(&doc);
        assert_eq!(
            lines,
            vec![
                "Exported 3 pages \u{2192} out/Acme_creative_analysis.pdf",
                "    001 offset 0",
                "    002 offset -1000",
                "    003 offset -2000 (blank)",
            ]
        );
    }
}
