//! Cédula (Colombian national ID) extraction from OCR text.
//!
//! Looks for an anchor phrase ("cédula de ciudadanía", "número") followed by
//! a digit group shaped like `12.345.678` or `123 456 789`. OCR output is
//! noisy, so accents and case are ignored and group separators may be any
//! run of periods or whitespace. No checksum validation is done.

use regex::Regex;
use std::sync::LazyLock;

static CEDULA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:c[eé]dula\s+de\s+ciudadan[ií]a(?:\s+n[uú]mero)?|n[uú]mero)\s*-?\s*([0-9]{2,3}(?:[.\s]*[0-9]{3}){2})",
    )
    .expect("cedula pattern is valid")
});

/// A digit group continuing past the third group makes the whole number malformed.
static TRAILING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[.\s]*[0-9]").expect("trailing digit pattern is valid"));

/// Extract the most plausible cédula number from `text`.
///
/// Returns the digits with every separator removed, or `None` if no anchored
/// digit group is present. Anchored groups that run on into more digits are
/// skipped rather than truncated.
pub fn extract_cedula(text: &str) -> Option<String> {
    CEDULA_PATTERN
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .find(|group| !TRAILING_DIGITS.is_match(&text[group.end()..]))
        .map(|group| normalize_digits(group.as_str()))
}

/// Strip whitespace and periods from a captured digit group.
fn normalize_digits(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .collect()
}
