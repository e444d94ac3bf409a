//! Text normalisation: collapse OCR layout artefacts into single-line text.
//!
//! Tesseract reproduces the page layout with hard line breaks, blank lines
//! between paragraphs, runs of spaces for column gaps and a trailing form
//! feed. None of that survives well in a spreadsheet cell, so every page is
//! flattened to one line of single-spaced words.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalise raw OCR output.
///
/// 1. Every `"\n\n"` becomes `"\n"` (paragraph gaps).
/// 2. Every remaining whitespace run (newlines, tabs, form feeds, repeated
///    spaces) becomes one ASCII space.
/// 3. Leading and trailing whitespace is trimmed.
///
/// Total and idempotent: any input, including `""`, yields a string that
/// normalises to itself.
pub fn normalize(raw: &str) -> String {
    let collapsed_paragraphs = raw.replace("\n\n", "\n");
    RE_WHITESPACE
        .replace_all(collapsed_paragraphs.trim(), " ")
        .into_owned()
}

/// Join already-normalised page texts in page order, one `\n` between pages.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}
