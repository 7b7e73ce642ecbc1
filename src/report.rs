//! Report synthesis: gallery + context → ordered report sections.
//!
//! [`synthesize`] is a pure function of its inputs. It produces structured
//! content ([`ReportSection`] / [`Block`]) and leaves presentation to the
//! renderers in [`crate::render`] and [`crate::raster`]. Sections always come
//! in the same order:
//!
//! ```text
//! Header → ScreenshotGrid → VisualAnalysis → BestPractices → Recommendations
//! ```
//!
//! Several lines depend on how many screenshots the gallery holds:
//!
//! | Screenshots | Effect |
//! |---|---|
//! | `< 3` | sequence "could benefit from additional screenshots", an *Immediate* action item |
//! | `< 5` | a *Priority* optimization item, "Consider adding more key features" |
//! | `> 1` | "Logical flow between screens", "consistent visual style" |
//!
//! The generation timestamp is the only non-deterministic value. It lives in a
//! [`Block::Timestamp`] so [`Report::fingerprint`] can leave it out.

use crate::context::ReportContext;
use crate::gallery::GalleryEntry;
use crate::types::Bitmap;
use chrono::{DateTime, Local};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("no screenshots in the gallery")]
    NoScreenshots,
}

impl ReportError {
    /// The message shown to the person who asked for the report.
    pub fn user_message(&self) -> &'static str {
        match self {
            ReportError::NoScreenshots => {
                "Please upload at least one screenshot to generate a report."
            }
        }
    }
}

/// User-entered identity of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportHeader {
    pub app_name: String,
    /// Shown as-is; never fetched.
    pub store_url: String,
    pub generated_at: DateTime<Local>,
}

impl ReportHeader {
    pub fn new(app_name: impl Into<String>, store_url: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            store_url: store_url.into(),
            generated_at: Local::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Header,
    ScreenshotGrid,
    VisualAnalysis,
    BestPractices,
    Recommendations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub title: String,
    pub blocks: Vec<Block>,
    /// Filenames of every screenshot the section covers, in gallery order.
    pub screenshots: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Field { label: String, value: String },
    Timestamp { label: String, value: DateTime<Local> },
    Paragraph { text: String },
    List { ordered: bool, items: Vec<ListItem> },
    Grid { screenshots: Vec<ScreenshotRef> },
    Subsection { title: String, blocks: Vec<Block> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    /// Bold run rendered before `text`, e.g. a review title.
    pub lead: Option<String>,
    pub text: String,
    pub emphasized: bool,
    pub children: Vec<ListItem>,
}

impl ListItem {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            lead: None,
            text: text.into(),
            emphasized: false,
            children: Vec::new(),
        }
    }

    fn emphasized(mut self) -> Self {
        self.emphasized = true;
        self
    }

    fn with_lead(mut self, lead: impl Into<String>) -> Self {
        self.lead = Some(lead.into());
        self
    }

    fn with_children(mut self, children: &[&str]) -> Self {
        self.children = children.iter().map(|c| ListItem::plain(*c)).collect();
        self
    }
}

/// One tile of the screenshot grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenshotRef {
    pub index: usize,
    pub filename: String,
    pub caption: String,
    #[serde(skip)]
    pub bitmap: Bitmap,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub header: ReportHeader,
    pub sections: Vec<ReportSection>,
}

impl Report {
    /// SHA-256 over the section structure, timestamps excluded.
    ///
    /// Two reports synthesized from the same gallery and context have the
    /// same fingerprint regardless of when they were generated.
    pub fn fingerprint(&self) -> String {
        let stable: Vec<ReportSection> = self
            .sections
            .iter()
            .map(|section| ReportSection {
                blocks: strip_timestamps(&section.blocks),
                ..section.clone()
            })
            .collect();
        // Serializing plain strings and numbers cannot fail.
        let bytes = serde_json::to_vec(&stable).unwrap_or_default();
        format!("{:x}", Sha256::digest(&bytes))
    }

    pub fn section(&self, kind: SectionKind) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn screenshot_count(&self) -> usize {
        self.section(SectionKind::ScreenshotGrid)
            .map(|s| s.screenshots.len())
            .unwrap_or(0)
    }
}

fn strip_timestamps(blocks: &[Block]) -> Vec<Block> {
    blocks
        .iter()
        .filter(|b| !matches!(b, Block::Timestamp { .. }))
        .map(|b| match b {
            Block::Subsection { title, blocks } => Block::Subsection {
                title: title.clone(),
                blocks: strip_timestamps(blocks),
            },
            other => other.clone(),
        })
        .collect()
}

/// Build a report, refusing an empty gallery.
pub fn generate_report(
    gallery: &[GalleryEntry],
    context: &ReportContext,
    header: ReportHeader,
) -> Result<Report, ReportError> {
    if gallery.is_empty() {
        return Err(ReportError::NoScreenshots);
    }
    let sections = synthesize(gallery, context, &header);
    Ok(Report { header, sections })
}

/// Transform the ordered gallery into report sections.
///
/// Pure apart from the header timestamp, which is taken from `header`.
/// An empty gallery still yields every section.
pub fn synthesize(
    gallery: &[GalleryEntry],
    context: &ReportContext,
    header: &ReportHeader,
) -> Vec<ReportSection> {
    let filenames: Vec<String> = gallery.iter().map(|e| e.filename.clone()).collect();
    let section = |kind, title: &str, blocks| ReportSection {
        kind,
        title: title.to_string(),
        blocks,
        screenshots: filenames.clone(),
    };

    vec![
        section(SectionKind::Header, "App Store Creative Analysis", header_blocks(header)),
        section(SectionKind::ScreenshotGrid, "Screenshots", grid_blocks(gallery)),
        section(
            SectionKind::VisualAnalysis,
            "Visual Analysis",
            visual_analysis_blocks(gallery.len(), context),
        ),
        section(
            SectionKind::BestPractices,
            "Best Practices Review",
            best_practices_blocks(gallery.len(), context),
        ),
        section(
            SectionKind::Recommendations,
            "Recommendations",
            recommendation_blocks(gallery.len(), context),
        ),
    ]
}

// ============================================================================
// Section builders
// ============================================================================

fn field(label: &str, value: &str) -> Block {
    Block::Field {
        label: label.to_string(),
        value: value.to_string(),
    }
}

fn paragraph(text: impl Into<String>) -> Block {
    Block::Paragraph { text: text.into() }
}

fn bullets<I, S>(items: I) -> Block
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Block::List {
        ordered: false,
        items: items.into_iter().map(ListItem::plain).collect(),
    }
}

fn subsection(title: &str, blocks: Vec<Block>) -> Block {
    Block::Subsection {
        title: title.to_string(),
        blocks,
    }
}

/// First three features, the way the context lists are abbreviated.
fn leading_features(context: &ReportContext) -> impl Iterator<Item = &String> {
    context.features.iter().take(3)
}

fn header_blocks(header: &ReportHeader) -> Vec<Block> {
    vec![
        field("App Name", &header.app_name),
        Block::Timestamp {
            label: "Report Date".to_string(),
            value: header.generated_at,
        },
        field("App Store URL", &header.store_url),
    ]
}

fn grid_blocks(gallery: &[GalleryEntry]) -> Vec<Block> {
    let screenshots = gallery
        .iter()
        .enumerate()
        .map(|(index, entry)| ScreenshotRef {
            index,
            filename: entry.filename.clone(),
            caption: format!("Screenshot {}", index + 1),
            bitmap: entry.bitmap.clone(),
        })
        .collect();
    vec![Block::Grid { screenshots }]
}

fn visual_analysis_blocks(count: usize, context: &ReportContext) -> Vec<Block> {
    (0..count)
        .map(|i| {
            // An empty feature list would make the rotation undefined.
            let feature = match context.features.len() {
                0 => "core",
                n => context.features[i % n].as_str(),
            };
            subsection(
                &format!("Screenshot {} Analysis", i + 1),
                vec![
                    subsection(
                        "Visual Elements",
                        vec![bullets([
                            format!("Screenshot shows {feature} feature"),
                            "Clear visual hierarchy with prominent UI elements".to_string(),
                            "Effective use of white space and typography".to_string(),
                            "Strong emphasis on user interaction points".to_string(),
                        ])],
                    ),
                    subsection(
                        "Key Observations",
                        vec![bullets([
                            "Composition: Well-structured layout with clear focal points",
                            "Text Clarity: Captions and UI text are easily readable",
                            "Feature Highlight: Clear emphasis on core functionality",
                        ])],
                    ),
                    subsection(
                        "Impact Assessment",
                        vec![bullets([
                            "User Appeal: Strong visual hierarchy guides attention",
                            "Brand Alignment: Consistent with app's visual identity",
                            "Message Clarity: Key benefits effectively communicated",
                        ])],
                    ),
                ],
            )
        })
        .collect()
}

fn best_practices_blocks(count: usize, context: &ReportContext) -> Vec<Block> {
    let coverage = if count >= 3 {
        "provides good coverage"
    } else {
        "could benefit from additional screenshots"
    };
    let sequence = subsection(
        "Screenshot Sequence Analysis",
        vec![
            paragraph(format!(
                "Your app store screenshots follow a {count}-image sequence that {coverage} of your app's features."
            )),
            paragraph(format!(
                "Based on your app's category ({}) and features, your sequence effectively showcases:",
                context.category
            )),
            bullets(leading_features(context).map(|f| format!("Feature alignment: {f}"))),
            paragraph(format!("Current App Store Rating: {}", context.rating)),
            bullets([
                format!(
                    "First impression impact: {}",
                    if count > 0 {
                        "Strong opening screenshot showcasing core value"
                    } else {
                        "No screenshots available"
                    }
                ),
                format!(
                    "Feature progression: {}",
                    if count > 1 {
                        "Logical flow between screens"
                    } else {
                        "Limited feature showcase"
                    }
                ),
                format!(
                    "Coverage depth: {}",
                    if count >= 5 {
                        "Comprehensive feature coverage"
                    } else {
                        "Consider adding more key features"
                    }
                ),
            ]),
        ],
    );

    let style = if count > 1 {
        "consistent visual style"
    } else {
        "single visual presentation"
    };
    let consistency = subsection(
        "Visual Consistency Review",
        vec![
            paragraph(format!(
                "The screenshots maintain a {style} which helps establish brand recognition."
            )),
            bullets([
                "Branding elements: Consistent use of colors and typography",
                "Layout structure: Organized presentation of UI elements",
                "Content hierarchy: Clear focus on key features and benefits",
            ]),
        ],
    );

    let framing = if count > 0 {
        "Appropriate device frames used"
    } else {
        "No device frames detected"
    };
    let technical = subsection(
        "Technical Assessment",
        vec![bullets([
            "Image quality: High-resolution screenshots suitable for all devices".to_string(),
            format!("Device framing: {framing}"),
            "Orientation: Consistent portrait orientation maintained".to_string(),
        ])],
    );

    vec![sequence, consistency, technical]
}

fn recommendation_blocks(count: usize, context: &ReportContext) -> Vec<Block> {
    let mut optimization = Vec::new();
    if count < 5 {
        optimization.push(ListItem::plain(
            "Priority: Add more screenshots to showcase key features and benefits",
        ));
    }
    optimization.push(ListItem::plain("Content Strategy:").with_children(&[
        "Lead with your most compelling feature",
        "Show a clear progression of value",
        "Include social proof or user testimonials",
    ]));
    optimization.push(ListItem::plain("Visual Enhancements:").with_children(&[
        "Use clear, action-oriented captions",
        "Maintain consistent branding elements",
        "Optimize contrast for readability",
    ]));

    let mut market = vec![
        paragraph("Based on your App Store presence and user reviews:"),
        subsection(
            "App Description Highlights",
            vec![
                paragraph(context.description.clone()),
                bullets(leading_features(context).map(|f| format!("Key Feature: {f}"))),
            ],
        ),
    ];
    if !context.reviews.is_empty() {
        market.push(subsection(
            "User Review Insights",
            vec![Block::List {
                ordered: false,
                items: context
                    .reviews
                    .iter()
                    .map(|r| ListItem::plain(r.text.clone()).with_lead(r.title.clone()))
                    .collect(),
            }],
        ));
    }
    market.push(subsection(
        "Competitive Edge Recommendations",
        vec![bullets([
            format!("Highlight your {} star rating in screenshots", context.rating),
            "Emphasize unique features that differentiate from competitors".to_string(),
            "Showcase user testimonials and social proof".to_string(),
        ])],
    ));

    let mut actions = Vec::new();
    if count < 3 {
        actions.push(
            ListItem::plain("Immediate: Add more screenshots (minimum 3-5 recommended)")
                .emphasized(),
        );
    }
    actions.extend(
        [
            "Review and enhance screenshot captions for clarity and impact",
            "Verify all text is legible across different device sizes",
            "Consider A/B testing different screenshot sequences",
        ]
        .into_iter()
        .map(ListItem::plain),
    );

    vec![
        subsection(
            "Screenshot Optimization",
            vec![Block::List {
                ordered: false,
                items: optimization,
            }],
        ),
        subsection("Market Context & User Feedback", market),
        subsection(
            "Action Items Priority",
            vec![Block::List {
                ordered: true,
                items: actions,
            }],
        ),
    ]
}
