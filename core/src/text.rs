//! # Description Helpers
//!
//! Normalization of free-text descriptions coming from the schema.

use once_cell::sync::Lazy;
use regex::Regex;

static TAB_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\t\s*").unwrap());

/// Turns tab-indented continuation lines into paragraph breaks and trims.
///
/// Returns `None` for missing or blank input.
pub fn fix_markdown(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    let fixed = TAB_BREAK.replace_all(raw, "\n\n");
    let fixed = fixed.trim();
    if fixed.is_empty() {
        None
    } else {
        Some(fixed.to_string())
    }
}

/// Renders flag names as inline code badges: `` `readOnly` `optional` ``.
pub fn flag_badges(flags: &[&str]) -> Option<String> {
    if flags.is_empty() {
        return None;
    }
    Some(
        flags
            .iter()
            .map(|f| format!("`{}`", f))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// Joins the present parts with blank lines.
pub fn join_paragraphs<I>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let joined = parts
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    (!joined.is_empty()).then_some(joined)
}
