//! Byte-level checks and text normalization.

use once_cell::sync::Lazy;
use regex::Regex;

/// Known binary magics. A match means the document needs a renderer or
/// OCR stage this build does not carry, so it is rejected as unsupported
/// rather than fed to a prompt as garbage.
const BINARY_MAGICS: &[(&[u8], &str)] = &[
    (b"%PDF-", "pdf"),
    (b"\x89PNG", "png"),
    (b"\xFF\xD8\xFF", "jpeg"),
    (b"PK\x03\x04", "zip"),
    (b"GIF8", "gif"),
    (b"\xD0\xCF\x11\xE0", "ole2"),
];

/// Detects a known binary container by its magic bytes.
#[must_use]
pub fn detect_binary_format(bytes: &[u8]) -> Option<&'static str> {
    BINARY_MAGICS
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|(_, name)| *name)
}

// Matches explicit textual page-break lines some upstream converters emit.
static PAGE_BREAK_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*-{2,}\s*page\s*break\s*-{2,}\s*$").expect("static pattern compiles")
});

static EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("static pattern compiles"));

/// Splits raw text into pages on form feeds and explicit break markers.
#[must_use]
pub fn split_pages(text: &str) -> Vec<String> {
    text.split('\u{0C}')
        .flat_map(|chunk| PAGE_BREAK_MARKER.split(chunk).map(str::to_owned))
        .collect()
}

/// Strips control characters (keeping newline and tab), normalizes line
/// endings, trims line ends, and collapses runs of blank lines.
#[must_use]
pub fn sanitize_text(raw: &str) -> String {
    let filtered: String = raw
        .replace("\r\n", "\n")
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect();

    let trimmed = filtered
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    EXCESS_BLANK_LINES
        .replace_all(&trimmed, "\n\n")
        .trim()
        .to_owned()
}
