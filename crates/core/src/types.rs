use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of relevant sections a ranking query may return.
pub const MAX_RELEVANT_SECTIONS: usize = 5;

/// Deterministic identity for a loaded document.
///
/// Derived from display name, byte size, and modification time. Two files
/// with identical name, size, and mtime get the same id and are treated as
/// the same document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn derive(name: &str, size: u64, modified: DateTime<Utc>) -> Self {
        DocumentId(format!("{}_{}_{}", name, size, modified.timestamp_millis()))
    }

    /// Wrap an id received verbatim from an external response.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        DocumentId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structural rank of a heading, 1 (most prominent) through 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    /// Heading level 1 -- useful as a default fallback when clamping.
    pub const H1: Self = HeadingLevel(1);

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Parse an `"H1".."H6"` label as produced by the AI extraction service.
    pub fn from_label(label: &str) -> Result<Self, InvalidHeadingLevel> {
        let trimmed = label.trim();
        let digits = trimmed
            .strip_prefix('H')
            .or_else(|| trimmed.strip_prefix('h'))
            .ok_or(InvalidHeadingLevel)?;
        let value: u8 = digits.parse().map_err(|_| InvalidHeadingLevel)?;
        HeadingLevel::try_from(value)
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = InvalidHeadingLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=6).contains(&value) {
            Ok(HeadingLevel(value))
        } else {
            Err(InvalidHeadingLevel)
        }
    }
}

impl TryFrom<String> for HeadingLevel {
    type Error = InvalidHeadingLevel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HeadingLevel::from_label(&value)
    }
}

impl From<HeadingLevel> for String {
    fn from(level: HeadingLevel) -> Self {
        level.to_string()
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.0)
    }
}

/// Which pipeline produced a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlineSource {
    Heuristic,
    Ai,
}

/// One entry of a document outline. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: HeadingLevel,
    pub text: String,
    pub page: u32,
    pub source: OutlineSource,
}

/// The currently active text selection and the document it came from.
///
/// At most one selection is active at a time; setting a new one invalidates
/// every result derived from the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub document_id: DocumentId,
    pub text: String,
}

/// A cross-document heading suggested in response to a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevantSection {
    pub document_id: DocumentId,
    pub page: u32,
    pub title: String,
}

#[derive(Debug, Error)]
#[error("Heading level must be between H1 and H6")]
pub struct InvalidHeadingLevel;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_document_id_deterministic() {
        let modified = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let a = DocumentId::derive("report.pdf", 1024, modified);
        let b = DocumentId::derive("report.pdf", 1024, modified);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("report.pdf_1024_"));
    }

    #[test]
    fn test_document_id_distinct_on_size() {
        let modified = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let a = DocumentId::derive("report.pdf", 1024, modified);
        let b = DocumentId::derive("report.pdf", 2048, modified);
        assert_ne!(a, b);
    }

    #[test]
    fn test_heading_level_valid_range() {
        assert!(HeadingLevel::try_from(1).is_ok());
        assert!(HeadingLevel::try_from(6).is_ok());
        assert!(HeadingLevel::try_from(0).is_err());
        assert!(HeadingLevel::try_from(7).is_err());
    }

    #[test]
    fn test_heading_level_labels() {
        assert_eq!(HeadingLevel::from_label("H1").unwrap().as_u8(), 1);
        assert_eq!(HeadingLevel::from_label(" h3 ").unwrap().as_u8(), 3);
        assert!(HeadingLevel::from_label("H7").is_err());
        assert!(HeadingLevel::from_label("Heading 1").is_err());
        assert!(HeadingLevel::from_label("1").is_err());
    }

    #[test]
    fn test_heading_level_display_roundtrip() {
        let level = HeadingLevel::try_from(4).unwrap();
        assert_eq!(level.to_string(), "H4");
        assert_eq!(HeadingLevel::from_label(&level.to_string()).unwrap(), level);
    }
}
