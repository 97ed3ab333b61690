//! Text cleanup for issue summaries and names placed on slides.
//!
//! Tracker text can carry line breaks, tabs, and control characters that
//! either render badly in a single paragraph or are not legal in XML.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse runs of whitespace (including line breaks) into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Control characters that XML 1.0 forbids or discourages.
static XML_INVALID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F\x{FFFE}\x{FFFF}]").unwrap());

/// Normalize a line of tracker text for display on a slide.
///
/// - Composes Unicode to NFC
/// - Drops characters that cannot appear in XML
/// - Collapses whitespace runs to single spaces
/// - Trims leading/trailing whitespace
pub fn normalize_text(text: &str) -> String {
    let composed: String = text.nfc().collect();
    let cleaned = XML_INVALID_REGEX.replace_all(&composed, "");
    WHITESPACE_COLLAPSE_REGEX
        .replace_all(&cleaned, " ")
        .trim()
        .to_string()
}
