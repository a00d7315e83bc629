//! Heading corpus assembly for cross-document ranking.
//!
//! Given the active selection's source document, the corpus is the union of
//! headings from every *other* loaded document. Each document contributes
//! its AI outline when non-empty and its heuristic outline otherwise --
//! never both, so no document competes with itself in the ranking.

use serde::Serialize;

use crate::state::Document;
use crate::types::{DocumentId, HeadingLevel};

/// One corpus entry as sent to the ranking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusHeading {
    pub document_id: DocumentId,
    pub document_name: String,
    pub page: u32,
    pub level: HeadingLevel,
    pub text: String,
}

/// Build the ranking corpus for a selection originating in `source`.
///
/// Documents are visited in insertion order; within a document, headings
/// keep their outline order.
pub fn build_corpus<'a>(
    source: &DocumentId,
    documents: impl Iterator<Item = &'a Document>,
) -> Vec<CorpusHeading> {
    let mut corpus = Vec::new();

    for doc in documents {
        if &doc.id == source {
            continue;
        }
        for heading in doc.effective_outline() {
            corpus.push(CorpusHeading {
                document_id: doc.id.clone(),
                document_name: doc.name.clone(),
                page: heading.page,
                level: heading.level,
                text: heading.text.clone(),
            });
        }
    }

    corpus
}
