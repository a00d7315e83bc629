//! Selection-triggered cross-document relevance matching.
//!
//! Runs when the selection changes or the loaded set changes. Preconditions
//! are checked before any service call: no active selection or no other
//! document clears every derived result instead of querying; an empty
//! heading corpus records "no headings available" on the sections slot.
//!
//! Staleness: each query captures a generation token at launch. Replacing
//! the selection or the document set bumps the generation, and a response
//! whose token no longer matches is discarded instead of overwriting the
//! newer query's result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossdoc_core::corpus::build_corpus;
use crossdoc_core::decode::decode_relevant_sections;
use crossdoc_core::state::{reduce, AppState, Concern, Event};

use crate::services::RankingService;

/// Monotone counter shared between the session and in-flight queries.
#[derive(Debug, Default, Clone)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    /// Start a new query; the token stays current until the next `begin`
    /// or `invalidate`.
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Invalidate every in-flight query.
    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.0.load(Ordering::SeqCst) == token
    }
}

/// Recompute the relevant sections for the current selection.
pub async fn refresh_relevance<S: RankingService>(
    state: AppState,
    service: &S,
    generation: &Generation,
) -> AppState {
    let Some(selection) = state.selection.clone() else {
        return reduce(state, Event::ClearDerived);
    };

    if state.other_documents(&selection.document_id).next().is_none() {
        return reduce(state, Event::ClearDerived);
    }

    let corpus = build_corpus(&selection.document_id, state.documents.iter());
    if corpus.is_empty() {
        let state = reduce(state, Event::SetRelevantSections(Vec::new()));
        return reduce(
            state,
            Event::OperationFailed(Concern::Sections, "no headings available".into()),
        );
    }

    let token = generation.begin();
    let state = reduce(state, Event::OperationStarted(Concern::Sections));

    let response = service.rank_sections(&selection.text, &corpus).await;

    if !generation.is_current(token) {
        log::debug!("discarding stale relevance response");
        // The result belongs to the newer query, but this operation
        // instance still needs its terminal event.
        return reduce(state, Event::OperationSucceeded(Concern::Sections));
    }

    let decoded = response
        .map_err(|e| e.to_string())
        .and_then(|text| decode_relevant_sections(&text).map_err(|e| e.to_string()));

    match decoded {
        Ok(sections) => {
            let state = reduce(state, Event::SetRelevantSections(sections));
            reduce(state, Event::OperationSucceeded(Concern::Sections))
        }
        Err(message) => {
            let state = reduce(state, Event::SetRelevantSections(Vec::new()));
            reduce(state, Event::OperationFailed(Concern::Sections, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use crossdoc_core::corpus::CorpusHeading;
    use crossdoc_core::state::Document;
    use crossdoc_core::types::{
        DocumentId, Heading, HeadingLevel, OutlineSource, Selection,
    };

    use super::*;
    use crate::services::ServiceError;

    struct CountingService {
        calls: AtomicUsize,
        response: String,
        /// Bumped before responding, to simulate a newer query launching
        /// while this one is in flight.
        invalidates: Option<Generation>,
    }

    impl CountingService {
        fn returning(response: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: response.to_string(),
                invalidates: None,
            }
        }
    }

    impl RankingService for CountingService {
        async fn rank_sections(
            &self,
            _selection: &str,
            _corpus: &[CorpusHeading],
        ) -> Result<String, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(generation) = &self.invalidates {
                generation.invalidate();
            }
            Ok(self.response.clone())
        }
    }

    fn make_document(name: &str, headings: Vec<&str>) -> Document {
        Document {
            id: DocumentId::from_raw(name),
            name: name.to_string(),
            bytes: Arc::new(Vec::new()),
            pages: Vec::new(),
            heuristic_outline: headings
                .into_iter()
                .map(|text| Heading {
                    level: HeadingLevel::H1,
                    text: text.to_string(),
                    page: 2,
                    source: OutlineSource::Heuristic,
                })
                .collect(),
            ai_outline: Vec::new(),
            resource: None,
        }
    }

    fn selected_state(documents: Vec<Document>) -> AppState {
        let state = reduce(AppState::default(), Event::AddDocuments(documents));
        reduce(
            state,
            Event::SetSelection(Some(Selection {
                document_id: DocumentId::from_raw("a"),
                text: "a selected passage".to_string(),
            })),
        )
    }

    #[tokio::test]
    async fn test_no_selection_clears_without_calling() {
        let service = CountingService::returning("[]");
        let state = reduce(
            AppState::default(),
            Event::AddDocuments(vec![make_document("a", vec!["X"])]),
        );

        let state = refresh_relevance(state, &service, &Generation::default()).await;
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert!(state.relevant_sections.is_empty());
    }

    #[tokio::test]
    async fn test_single_document_clears_without_calling() {
        let service = CountingService::returning("[]");
        let state = selected_state(vec![make_document("a", vec!["X"])]);

        let state = refresh_relevance(state, &service, &Generation::default()).await;
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert!(state.relevant_sections.is_empty());
        assert!(state.operations.get(Concern::Sections).error.is_none());
    }

    #[tokio::test]
    async fn test_empty_corpus_records_error_without_calling() {
        let service = CountingService::returning("[]");
        let state = selected_state(vec![
            make_document("a", vec!["Only the source has headings"]),
            make_document("b", vec![]),
        ]);

        let state = refresh_relevance(state, &service, &Generation::default()).await;
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            state.operations.get(Concern::Sections).error.as_deref(),
            Some("no headings available")
        );
    }

    #[tokio::test]
    async fn test_happy_path_sets_sections() {
        let service = CountingService::returning(
            r#"Sure! [{"documentId": "b", "page": 2, "title": "Results"}]"#,
        );
        let state = selected_state(vec![
            make_document("a", vec!["Source"]),
            make_document("b", vec!["Results"]),
        ]);

        let state = refresh_relevance(state, &service, &Generation::default()).await;
        assert_eq!(state.relevant_sections.len(), 1);
        assert_eq!(state.relevant_sections[0].title, "Results");
        assert_eq!(state.relevant_sections[0].document_id.as_str(), "b");
        assert!(!state.operations.get(Concern::Sections).in_progress);
    }

    #[tokio::test]
    async fn test_decode_failure_sets_error_and_clears() {
        let service = CountingService::returning("[{broken}]");
        let mut state = selected_state(vec![
            make_document("a", vec!["Source"]),
            make_document("b", vec!["Results"]),
        ]);
        state.relevant_sections = vec![crossdoc_core::types::RelevantSection {
            document_id: DocumentId::from_raw("b"),
            page: 1,
            title: "Old".into(),
        }];

        let state = refresh_relevance(state, &service, &Generation::default()).await;
        assert!(state.relevant_sections.is_empty());
        assert!(state.operations.get(Concern::Sections).error.is_some());
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let generation = Generation::default();
        let service = CountingService {
            calls: AtomicUsize::new(0),
            response: r#"[{"documentId": "b", "page": 2, "title": "Stale"}]"#.to_string(),
            invalidates: Some(generation.clone()),
        };
        let state = selected_state(vec![
            make_document("a", vec!["Source"]),
            make_document("b", vec!["Results"]),
        ]);

        let state = refresh_relevance(state, &service, &generation).await;
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert!(
            state.relevant_sections.is_empty(),
            "a superseded response never lands"
        );
        let op = state.operations.get(Concern::Sections);
        assert!(op.error.is_none());
        assert!(!op.in_progress, "the discarded query still terminates its slot");
    }

    #[test]
    fn test_generation_tokens() {
        let generation = Generation::default();
        let first = generation.begin();
        assert!(generation.is_current(first));

        let second = generation.begin();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));

        generation.invalidate();
        assert!(!generation.is_current(second));
    }
}
