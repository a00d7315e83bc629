//! Page-level heading-candidate detection.
//!
//! A candidate is a span that *looks* like a heading: larger than the page's
//! body text, bold, or shaped like one (upper-case, enumerated, or ending
//! with a colon). Candidates are produced lazily and consumed exactly once
//! by the outline assembler; nothing here looks beyond a single page.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::spans::TextSpan;

/// Quantisation bucket width for font sizes (points).
pub const FONT_SIZE_BUCKET: f32 = 0.5;

/// A span's rounded size must exceed the page's most frequent size by more
/// than this factor to count as a size signal.
const SIZE_SIGNAL_FACTOR: f32 = 1.05;

/// Minimum weighted score for a span to qualify as a candidate.
const MIN_SCORE: u8 = 2;

/// Trimmed candidate text length bounds; anything outside is caption or
/// footer noise.
const MIN_TEXT_LEN: usize = 2;
const MAX_TEXT_LEN: usize = 100;

/// A plausible heading found on one page. Page-local; never persisted
/// outside the assembler's input.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingCandidate {
    pub text: String,
    /// Font size rounded to [`FONT_SIZE_BUCKET`].
    pub font_size: f32,
    pub is_bold: bool,
    pub page: u32,
    pub y: f32,
}

/// Quantise a font size into its bucket.
pub fn bucket(size: f32) -> f32 {
    (size / FONT_SIZE_BUCKET).round() * FONT_SIZE_BUCKET
}

/// The page's most frequent rounded font size, weighted by character count.
fn modal_font_size(spans: &[TextSpan]) -> f32 {
    let mut histogram: HashMap<i32, usize> = HashMap::new();
    for span in spans {
        if span.font_size <= 0.0 {
            continue;
        }
        let key = (bucket(span.font_size) * 100.0).round() as i32;
        *histogram.entry(key).or_insert(0) += span.text.chars().count();
    }
    histogram
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(key, _)| key as f32 / 100.0)
        .unwrap_or(12.0)
}

fn is_all_uppercase(text: &str) -> bool {
    let mut has_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            has_alpha = true;
            if !c.is_uppercase() {
                return false;
            }
        }
    }
    has_alpha
}

fn has_enumeration_marker(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\(?\d+(\.\d+)*[.)]").unwrap());
    re.is_match(text)
}

/// Heading-shape signal: fully upper-case, a leading numeric enumeration
/// marker ("1.", "2.3", "(4)"), or a trailing colon.
fn has_heading_shape(text: &str) -> bool {
    is_all_uppercase(text) || has_enumeration_marker(text) || text.ends_with(':')
}

/// Produce the page's heading candidates as a lazy iterator.
///
/// Each of three independent binary signals contributes one point; a span
/// qualifies at [`MIN_SCORE`] points:
///
/// - size: rounded size more than 5% above the page's most frequent size,
/// - weight: the font reports bold,
/// - shape: see [`has_heading_shape`].
///
/// Spans whose trimmed text is shorter than 2 or longer than 100 characters
/// are rejected regardless of score.
pub fn page_candidates(page: u32, spans: Vec<TextSpan>) -> impl Iterator<Item = HeadingCandidate> {
    let modal = modal_font_size(&spans);

    spans.into_iter().filter_map(move |span| {
        let text = span.text.trim();
        let len = text.chars().count();
        if !(MIN_TEXT_LEN..=MAX_TEXT_LEN).contains(&len) {
            return None;
        }

        let rounded = bucket(span.font_size);
        let mut score = 0u8;
        if rounded > modal * SIZE_SIGNAL_FACTOR {
            score += 1;
        }
        if span.is_bold {
            score += 1;
        }
        if has_heading_shape(text) {
            score += 1;
        }

        if score < MIN_SCORE {
            return None;
        }

        Some(HeadingCandidate {
            text: text.to_string(),
            font_size: rounded,
            is_bold: span.is_bold,
            page,
            y: span.y,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, font_size: f32, is_bold: bool, y: f32) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            x: 0.0,
            y,
            font_size,
            is_bold,
        }
    }

    /// A page whose body is plenty of 10pt text.
    fn with_body(mut extra: Vec<TextSpan>) -> Vec<TextSpan> {
        let mut spans = vec![
            span(&"body text ".repeat(30), 10.0, false, 600.0),
            span(&"more body ".repeat(30), 10.0, false, 580.0),
        ];
        spans.append(&mut extra);
        spans
    }

    fn collect(spans: Vec<TextSpan>) -> Vec<HeadingCandidate> {
        page_candidates(1, spans).collect()
    }

    #[test]
    fn test_large_bold_span_qualifies() {
        let candidates = collect(with_body(vec![span("Introduction", 16.0, true, 700.0)]));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "Introduction");
        assert_eq!(candidates[0].font_size, 16.0);
    }

    #[test]
    fn test_single_signal_is_not_enough() {
        // Large but regular weight and sentence shape: one point.
        let candidates = collect(with_body(vec![span("A slightly larger note", 12.0, false, 700.0)]));
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_bold_plus_shape_without_size() {
        let candidates = collect(with_body(vec![span("SUMMARY", 10.0, true, 700.0)]));
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_size_plus_enumeration_shape() {
        let candidates = collect(with_body(vec![span("1. Background", 14.0, false, 700.0)]));
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_size_plus_trailing_colon() {
        let candidates = collect(with_body(vec![span("Materials used:", 14.0, false, 700.0)]));
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_size_signal_requires_five_percent_margin() {
        // 10.2 rounds into the body bucket, so size contributes nothing.
        let candidates = collect(with_body(vec![span("BOLDISH", 10.2, true, 700.0)]));
        // uppercase + bold = 2 points even without the size signal.
        assert_eq!(candidates.len(), 1);

        let candidates = collect(with_body(vec![span("Quiet heading", 10.2, true, 700.0)]));
        assert!(candidates.is_empty(), "bold alone scores a single point");
    }

    #[test]
    fn test_length_bounds_reject_noise() {
        let long = "x".repeat(101);
        let candidates = collect(with_body(vec![
            span("A", 16.0, true, 700.0),
            span(&long, 16.0, true, 680.0),
        ]));
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_lazy_and_page_tagged() {
        let mut iter = page_candidates(7, with_body(vec![span("Results", 16.0, true, 700.0)]));
        let first = iter.next().unwrap();
        assert_eq!(first.page, 7);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_uppercase_needs_letters() {
        // Digits-only text has no case; shape must not fire on it.
        let candidates = collect(with_body(vec![span("2024", 10.0, true, 700.0)]));
        assert!(candidates.is_empty());
    }
}
