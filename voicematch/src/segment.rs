use once_cell::sync::Lazy;
use regex::Regex;

/// Clause boundaries: CJK and ASCII sentence punctuation, commas,
/// semicolons, space, newline, and runs of two or more `.` (colloquial
/// ellipsis). A single `.` is not a boundary so decimals and abbreviations
/// survive.
static BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[。！？!?，,；; \n]|\.{2,}").expect("boundary pattern"));

/// Split normalized text into ordered fragments.
///
/// Fragments are trimmed; those shorter than `min_chars` Unicode scalar
/// values are dropped, which removes interjections like "哈" or "嗯".
pub fn segment(text: &str, min_chars: usize) -> Vec<String> {
    BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().count() >= min_chars)
        .map(str::to_string)
        .collect()
}
