//! Document-level outline assembly.
//!
//! Consumes the per-page candidate sequences for one document and produces
//! an ordered heuristic outline: font sizes are clustered into at most
//! [`MAX_HEURISTIC_LEVELS`] heading levels, leading list markers are
//! stripped, and span-fragmented headings on the same visual line are merged
//! back into one entry.

use std::sync::OnceLock;

use regex::Regex;

use crossdoc_core::types::{Heading, HeadingLevel, OutlineSource};

use crate::candidates::HeadingCandidate;

/// How many font-size tiers become heading levels. Candidates at smaller
/// sizes are dropped, so documents with deeper structure lose their finest
/// tier rather than overflowing the level range.
pub const MAX_HEURISTIC_LEVELS: usize = 3;

/// Two same-page, same-level candidates within this vertical distance are
/// fragments of one heading and get merged.
pub const MERGE_Y_THRESHOLD: f32 = 5.0;

/// Strip leading bullet and numeric-enumeration markers from heading text.
///
/// Markers are bullet/dash characters and enumerations like `1.`, `2.1`,
/// `(3)`. A bare number with no dot or parenthesis is content, not a marker.
fn strip_markers(text: &str) -> &str {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"^(?:[\u{2022}\u{2023}\u{25E6}\u{2043}\u{2219}\-\u{2013}\u{2014}]+\s*|\(\d+\)\s*|\d+(?:\.\d+)+\.?(?:\s+|$)|\d+[.)](?:\s+|$))",
        )
        .unwrap()
    });

    let mut rest = text.trim();
    while let Some(m) = re.find(rest) {
        rest = rest[m.end()..].trim_start();
    }
    rest
}

/// Map the distinct rounded candidate sizes to levels 1..=[`MAX_HEURISTIC_LEVELS`].
///
/// Sizes are ranked descending; the largest becomes level 1. Returns
/// `(size-key, level)` pairs; sizes outside the top tiers are absent.
fn level_map(candidates: &[HeadingCandidate]) -> Vec<(i32, HeadingLevel)> {
    let mut sizes: Vec<i32> = candidates
        .iter()
        .map(|c| (c.font_size * 100.0).round() as i32)
        .collect();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    sizes.dedup();
    sizes.truncate(MAX_HEURISTIC_LEVELS);

    sizes
        .into_iter()
        .enumerate()
        .filter_map(|(rank, size)| {
            let level = HeadingLevel::try_from((rank + 1) as u8).ok()?;
            Some((size, level))
        })
        .collect()
}

/// Assemble the document outline from per-page candidate sequences given in
/// page order.
///
/// Deterministic for identical input ordering; purely synchronous.
pub fn assemble_outline<I, P>(pages: I) -> Vec<Heading>
where
    I: IntoIterator<Item = P>,
    P: IntoIterator<Item = HeadingCandidate>,
{
    let candidates: Vec<HeadingCandidate> = pages.into_iter().flatten().collect();
    let levels = level_map(&candidates);

    let mut outline: Vec<Heading> = Vec::new();
    // Vertical position of the most recently emitted heading, for merging.
    let mut last_y: f32 = f32::NEG_INFINITY;

    for candidate in candidates {
        let size_key = (candidate.font_size * 100.0).round() as i32;
        let Some(&(_, level)) = levels.iter().find(|(size, _)| *size == size_key) else {
            // Below the smallest mapped tier.
            continue;
        };

        let cleaned = strip_markers(&candidate.text);
        if cleaned.is_empty() {
            continue;
        }

        if let Some(previous) = outline.last_mut() {
            let same_line = previous.page == candidate.page
                && previous.level == level
                && (last_y - candidate.y).abs() <= MERGE_Y_THRESHOLD;
            if same_line {
                previous.text.push(' ');
                previous.text.push_str(cleaned);
                last_y = candidate.y;
                continue;
            }
        }

        last_y = candidate.y;
        outline.push(Heading {
            level,
            text: cleaned.to_string(),
            page: candidate.page,
            source: OutlineSource::Heuristic,
        });
    }

    outline
}
