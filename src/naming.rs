//! Output file naming.
//!
//! Exported documents are named after the app: `<app>_creative_analysis.pdf`.
//! The app name is free text typed by a user, so it is cleaned before it
//! touches the filesystem:
//!
//! - `"Acme Chat"` → `Acme Chat_creative_analysis.pdf`
//! - `"a/b\\c"` → `a_b_c_creative_analysis.pdf`
//! - `"  "` → `report_creative_analysis.pdf`
//! - `".."` → `report_creative_analysis.pdf`

/// Suffix appended to the app name, before the extension.
pub const EXPORT_SUFFIX: &str = "_creative_analysis";

/// Used when nothing usable is left of the app name.
const FALLBACK_STEM: &str = "report";

/// Characters that are unsafe in a file name on at least one platform.
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// File name of the PDF exported for `app_name`.
pub fn export_file_name(app_name: &str) -> String {
    format!("{}{EXPORT_SUFFIX}.pdf", sanitize_stem(app_name))
}

/// Make `name` safe to use as a single path component.
///
/// Reserved characters and control characters become `_`. Surrounding
/// whitespace and dots are trimmed, so the result can never be `.`, `..`,
/// or a hidden file.
pub fn sanitize_stem(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_control() || RESERVED.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if trimmed.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name() {
        assert_eq!(export_file_name("Acme"), "Acme_creative_analysis.pdf");
    }

    #[test]
    fn spaces_are_kept() {
        assert_eq!(
            export_file_name("Acme Chat"),
            "Acme Chat_creative_analysis.pdf"
        );
    }

    #[test]
    fn path_separators_replaced() {
        assert_eq!(export_file_name("a/b\\c"), "a_b_c_creative_analysis.pdf");
    }

    #[test]
    fn control_characters_replaced() {
        assert_eq!(sanitize_stem("tab\there\n"), "tab_here_");
    }

    #[test]
    fn empty_name_falls_back() {
        assert_eq!(export_file_name(""), "report_creative_analysis.pdf");
        assert_eq!(export_file_name("   "), "report_creative_analysis.pdf");
    }

    #[test]
    fn dot_names_cannot_escape() {
        assert_eq!(sanitize_stem(".."), "report");
        assert_eq!(sanitize_stem("../etc"), "_etc");
        assert_eq!(sanitize_stem(".hidden"), "hidden");
    }

    #[test]
    fn unicode_is_preserved() {
        assert_eq!(sanitize_stem("Café ☕"), "Café ☕");
    }
}
