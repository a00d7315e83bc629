//! The parallel AI outline extraction coordinator.
//!
//! One extraction future per document that still lacks an AI outline, all
//! issued concurrently. Failures are absorbed per document: a transport
//! error or a response that violates the array contract leaves that
//! document's AI outline empty, so the heuristic outline stays in effect.
//! The store is only touched after the entire batch settles, in a single
//! `AiOutlinesReady` event.

use futures::future::join_all;

use crossdoc_core::decode::decode_headings;
use crossdoc_core::state::{reduce, AppState, Concern, Event};

use crate::services::HeadingExtractionService;

/// Run one extraction batch over the documents whose AI outline is still
/// empty. Re-running targets exactly the documents that still lack one.
pub async fn run_extraction<S: HeadingExtractionService>(state: AppState, service: &S) -> AppState {
    if state.documents_without_ai_outline().is_empty() {
        return state;
    }

    let state = reduce(state, Event::OperationStarted(Concern::Headings));
    log::info!(
        "extracting outlines for {} document(s)",
        state.documents_without_ai_outline().len()
    );

    let batch = join_all(
        state
            .documents
            .iter()
            .filter(|doc| !doc.has_ai_outline())
            .map(|doc| async move {
                let outline = match service.extract_headings(&doc.name, &doc.pages).await {
                    Ok(response) => match decode_headings(&response) {
                        Ok(headings) => headings,
                        Err(e) => {
                            log::warn!("outline response for {} rejected: {e}", doc.name);
                            Vec::new()
                        }
                    },
                    Err(e) => {
                        log::warn!("outline extraction for {} failed: {e}", doc.name);
                        Vec::new()
                    }
                };
                (doc.id.clone(), outline)
            }),
    )
    .await;

    let settled = batch.iter().filter(|(_, o)| !o.is_empty()).count();
    log::info!("extraction batch settled: {settled} of {} outlines", batch.len());

    let state = reduce(state, Event::AiOutlinesReady(batch));
    reduce(state, Event::OperationSucceeded(Concern::Headings))
}
