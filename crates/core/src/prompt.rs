//! Prompt builders for the AI services.
//!
//! The wording here is a tunable parameter; the structural guarantees live
//! in [`crate::decode`]. Builders only assemble the inputs in a fixed shape
//! and order so the decoding contract on the other side stays honest.

use crate::corpus::CorpusHeading;
use crate::types::MAX_RELEVANT_SECTIONS;

/// Prompt for whole-document heading extraction.
///
/// The document travels as its display name followed by per-page text in
/// page order.
pub fn build_extraction_prompt(name: &str, pages: &[String]) -> String {
    let mut parts = vec![format!(
        "Extract the section headings of the following document. \
         Respond with a JSON array of objects shaped as \
         {{\"text\": string, \"page\": number, \"level\": \"H1\"..\"H6\"}}, \
         in document order. Respond with the array only.\n\nDocument: {}",
        name
    )];

    for (index, page) in pages.iter().enumerate() {
        parts.push(format!("--- Page {} ---\n{}", index + 1, page));
    }

    parts.join("\n\n")
}

/// Prompt for ranking the heading corpus against a selection.
pub fn build_ranking_prompt(selection: &str, corpus: &[CorpusHeading]) -> String {
    let corpus_json = serde_json::to_string_pretty(corpus).unwrap_or_else(|_| "[]".to_string());

    format!(
        "A reader selected this passage:\n\n{selection}\n\n\
         These are the headings available in the other loaded documents:\n\n\
         {corpus_json}\n\n\
         Return the headings most relevant to the selected passage as a JSON \
         array of at most {MAX_RELEVANT_SECTIONS} objects shaped as \
         {{\"documentId\": string, \"page\": number, \"title\": string}}, \
         ordered by descending relevance. Respond with the array only."
    )
}

/// Prompt for summarized insights over the selection and its ranked sections.
pub fn build_insights_prompt(selection: &str, section_titles: &[String]) -> String {
    let related = if section_titles.is_empty() {
        "none".to_string()
    } else {
        section_titles.join("; ")
    };

    format!(
        "Summarize the key insights of the following passage in a short \
         paragraph, connecting it to the related sections where useful.\n\n\
         Passage:\n{selection}\n\nRelated sections: {related}"
    )
}

/// Prompt for a short narration script suitable for speech synthesis.
pub fn build_narration_prompt(selection: &str) -> String {
    format!(
        "Write a short spoken narration (3-4 sentences, plain prose, no \
         markup) presenting the following passage to a listener:\n\n{selection}"
    )
}
