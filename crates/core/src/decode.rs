//! Bracket-delimited JSON extraction for AI service responses.
//!
//! The text services return free-form prose that is *expected* to contain a
//! JSON array somewhere inside it. The contract implemented here:
//!
//! 1. Locate the first `[` and the last `]` in the response. If either is
//!    absent the response carries zero entries -- that is an empty result,
//!    not an error.
//! 2. Parse the delimited substring as a JSON array. A parse failure is a
//!    [`DecodeError::Contract`] -- the response was received but does not
//!    honor the shape the service was instructed to produce.
//! 3. Validate each element individually and drop the ones that do not
//!    satisfy the schema. A single malformed element never poisons the rest.

use serde_json::Value;
use thiserror::Error;

use crate::types::{
    DocumentId, Heading, HeadingLevel, OutlineSource, RelevantSection, MAX_RELEVANT_SECTIONS,
};

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The response contained a bracketed substring that is not a JSON array.
    #[error("response violates the JSON array contract: {0}")]
    Contract(String),
}

/// Slice out the first-`[`-to-last-`]` substring, or `None` when the
/// response contains no bracket pair.
fn array_slice(response: &str) -> Option<&str> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

/// Parse the bracketed substring of `response` into a JSON array of values.
fn parse_array(response: &str) -> Result<Vec<Value>, DecodeError> {
    let Some(slice) = array_slice(response) else {
        return Ok(Vec::new());
    };

    match serde_json::from_str::<Value>(slice) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(DecodeError::Contract(format!(
            "expected a JSON array, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(DecodeError::Contract(e.to_string())),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read a JSON field as a page number. Only numeric values qualify; the
/// services occasionally emit pages as floats, which are truncated.
fn page_field(value: &Value, key: &str) -> Option<u32> {
    match value.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|p| u32::try_from(p).ok()),
        _ => None,
    }
}

/// Read a JSON field as a non-empty, trimmed string.
fn text_field(value: &Value, key: &str) -> Option<String> {
    let text = value.get(key)?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

/// Decode the extraction service's response into an AI outline.
///
/// Elements missing a non-empty `text`, a numeric `page`, or a valid
/// `"H1".."H6"` level are dropped.
pub fn decode_headings(response: &str) -> Result<Vec<Heading>, DecodeError> {
    let items = parse_array(response)?;

    let headings = items
        .iter()
        .filter_map(|item| {
            let text = text_field(item, "text")?;
            let page = page_field(item, "page")?;
            let level = HeadingLevel::from_label(item.get("level")?.as_str()?).ok()?;
            Some(Heading {
                level,
                text,
                page,
                source: OutlineSource::Ai,
            })
        })
        .collect();

    Ok(headings)
}

/// Decode the ranking service's response into relevant sections.
///
/// The document identity may arrive under `documentId` or the legacy
/// `pdfId` key. The result is capped at [`MAX_RELEVANT_SECTIONS`] even when
/// the service ignores its instruction.
pub fn decode_relevant_sections(response: &str) -> Result<Vec<RelevantSection>, DecodeError> {
    let items = parse_array(response)?;

    let mut sections: Vec<RelevantSection> = items
        .iter()
        .filter_map(|item| {
            let id = text_field(item, "documentId").or_else(|| text_field(item, "pdfId"))?;
            let page = page_field(item, "page")?;
            let title = text_field(item, "title")?;
            Some(RelevantSection {
                document_id: DocumentId::from_raw(id),
                page,
                title,
            })
        })
        .collect();

    sections.truncate(MAX_RELEVANT_SECTIONS);
    Ok(sections)
}
