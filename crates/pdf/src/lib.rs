//! PDF text extraction and heuristic outline assembly.
//!
//! This crate turns raw PDF bytes into what the cross-document pipeline
//! needs from a document: plain text per page and a heuristic outline built
//! from page-level heading candidates.
//!
//! # Pipeline
//!
//! ```text
//! bytes  ->  ContentOp[]  ->  TextSpan[]  ->  HeadingCandidate  ->  Heading[]
//!   (lopdf)    backend         spans            candidates          outline
//! ```
//!
//! Every stage past the backend is a pure transformation; I/O lives behind
//! the [`backend::PdfBackend`] trait.

use thiserror::Error;

use crossdoc_core::types::Heading;

pub mod backend;
pub mod candidates;
pub mod outline;
pub mod spans;

use backend::{LopdfBackend, PdfBackend};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the ingestion stage extracts from one document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Plain reading-order text per page, in page order.
    pub pages: Vec<String>,
    /// Heuristic outline assembled from page-level candidates.
    pub outline: Vec<Heading>,
}

/// Parse PDF bytes and run the full heuristic pipeline.
pub fn extract_document(bytes: &[u8]) -> Result<ExtractedDocument, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    extract_with_backend(&backend)
}

/// Run the pipeline on any backend (mockable in tests).
pub fn extract_with_backend(backend: &dyn PdfBackend) -> Result<ExtractedDocument, PdfError> {
    let all_pages = spans::extract_all_pages(backend)?;

    let pages: Vec<String> = all_pages
        .iter()
        .map(|(_, page_spans)| spans::page_text(page_spans))
        .collect();

    let outline = outline::assemble_outline(
        all_pages
            .into_iter()
            .map(|(page_num, page_spans)| candidates::page_candidates(page_num, page_spans)),
    );

    Ok(ExtractedDocument { pages, outline })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use backend::{BackendFontInfo, ContentOp, PageId, PdfValue};

    /// Backend serving canned content ops for a two-page document.
    struct FixtureBackend {
        pages: BTreeMap<u32, Vec<ContentOp>>,
    }

    impl PdfBackend for FixtureBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            self.pages.keys().map(|&n| (n, (n, 0u16))).collect()
        }

        fn page_fonts(&self, _page: PageId) -> Result<Vec<BackendFontInfo>, PdfError> {
            Ok(vec![
                BackendFontInfo {
                    name: b"F1".to_vec(),
                    base_font: Some("Times-Roman".to_string()),
                },
                BackendFontInfo {
                    name: b"F2".to_vec(),
                    base_font: Some("Times-Bold".to_string()),
                },
            ])
        }

        fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
            // Encode the page number so decode_content can find the ops.
            Ok(vec![page.0 as u8])
        }

        fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
            let page = data[0] as u32;
            Ok(self.pages.get(&page).cloned().unwrap_or_default())
        }
    }

    fn show(font: &[u8], size: i64, x: i64, y: i64, text: &str) -> Vec<ContentOp> {
        vec![
            ContentOp {
                operator: "BT".into(),
                operands: vec![],
            },
            ContentOp {
                operator: "Tf".into(),
                operands: vec![PdfValue::Name(font.to_vec()), PdfValue::Integer(size)],
            },
            ContentOp {
                operator: "Td".into(),
                operands: vec![PdfValue::Integer(x), PdfValue::Integer(y)],
            },
            ContentOp {
                operator: "Tj".into(),
                operands: vec![PdfValue::Str(text.as_bytes().to_vec())],
            },
            ContentOp {
                operator: "ET".into(),
                operands: vec![],
            },
        ]
    }

    fn fixture() -> FixtureBackend {
        let mut pages = BTreeMap::new();

        let mut page1 = Vec::new();
        page1.extend(show(b"F2", 20, 72, 720, "1. Introduction"));
        page1.extend(show(b"F1", 10, 72, 700, &"body text ".repeat(40)));
        page1.extend(show(b"F1", 10, 72, 690, &"more body text ".repeat(40)));
        pages.insert(1, page1);

        let mut page2 = Vec::new();
        page2.extend(show(b"F2", 20, 72, 720, "2. Methods"));
        page2.extend(show(b"F1", 10, 72, 700, &"body text ".repeat(40)));
        pages.insert(2, page2);

        FixtureBackend { pages }
    }

    #[test]
    fn test_full_pipeline_extracts_pages_and_outline() {
        let extracted = extract_with_backend(&fixture()).unwrap();

        assert_eq!(extracted.pages.len(), 2);
        assert!(extracted.pages[0].contains("1. Introduction"));
        assert!(extracted.pages[1].contains("2. Methods"));

        let texts: Vec<&str> = extracted.outline.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["Introduction", "Methods"]);
        assert_eq!(extracted.outline[0].page, 1);
        assert_eq!(extracted.outline[1].page, 2);
        assert!(extracted.outline.iter().all(|h| h.level.as_u8() == 1));
    }

    #[test]
    fn test_pipeline_idempotent() {
        let first = extract_with_backend(&fixture()).unwrap();
        let second = extract_with_backend(&fixture()).unwrap();
        assert_eq!(first.outline, second.outline);
        assert_eq!(first.pages, second.pages);
    }

    #[test]
    fn test_invalid_bytes_error() {
        assert!(extract_document(b"definitely not a pdf").is_err());
    }
}
