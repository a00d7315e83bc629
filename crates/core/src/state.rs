//! The application state machine.
//!
//! Every mutation of session state is expressed as an [`Event`] and applied
//! through the single [`reduce`] function, which consumes the current
//! snapshot and returns the next one. There is no transition graph: any
//! event is valid in any state. The only causal coupling is derived-state
//! invalidation -- replacing the selection or the document set invalidates
//! relevance results, insights, and audio, which the shell expresses by
//! dispatching [`Event::ClearDerived`].
//!
//! The reducer is pure except for one deliberate seam: removing a document
//! releases its transient viewer resource through the
//! [`ReleasableResource`] trait. The release is idempotent and happens
//! exactly once per removal; the concrete resource (a temp file in the CLI)
//! lives in the shell.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::{DocumentId, Heading, RelevantSection, Selection};

/// A transient resource exclusively owned by one document, released when the
/// document is removed. Implementations must tolerate a second `release`
/// call as a no-op.
pub trait ReleasableResource: Send + Sync + fmt::Debug {
    fn release(&self);
}

/// One of the five independently tracked operation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Concern {
    Files,
    Headings,
    Sections,
    Insights,
    Audio,
}

impl Concern {
    pub const ALL: [Concern; 5] = [
        Concern::Files,
        Concern::Headings,
        Concern::Sections,
        Concern::Insights,
        Concern::Audio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Concern::Files => "files",
            Concern::Headings => "headings",
            Concern::Sections => "sections",
            Concern::Insights => "insights",
            Concern::Audio => "audio",
        }
    }
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// In-progress flag and last error for one concern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationState {
    pub in_progress: bool,
    pub error: Option<String>,
}

/// The five operation slots. A failure in one never blocks another.
#[derive(Debug, Clone, Default)]
pub struct Operations {
    files: OperationState,
    headings: OperationState,
    sections: OperationState,
    insights: OperationState,
    audio: OperationState,
}

impl Operations {
    pub fn get(&self, concern: Concern) -> &OperationState {
        match concern {
            Concern::Files => &self.files,
            Concern::Headings => &self.headings,
            Concern::Sections => &self.sections,
            Concern::Insights => &self.insights,
            Concern::Audio => &self.audio,
        }
    }

    fn get_mut(&mut self, concern: Concern) -> &mut OperationState {
        match concern {
            Concern::Files => &mut self.files,
            Concern::Headings => &mut self.headings,
            Concern::Sections => &mut self.sections,
            Concern::Insights => &mut self.insights,
            Concern::Audio => &mut self.audio,
        }
    }
}

/// A loaded document and everything derived from it.
///
/// Owned exclusively by [`AppState`]; extractor components receive read-only
/// views and hold no references after returning.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub bytes: Arc<Vec<u8>>,
    /// Extracted text per page, in page order.
    pub pages: Vec<String>,
    pub heuristic_outline: Vec<Heading>,
    pub ai_outline: Vec<Heading>,
    /// Viewer-collaborator resource, released on removal.
    pub resource: Option<Arc<dyn ReleasableResource>>,
}

impl Document {
    pub fn has_ai_outline(&self) -> bool {
        !self.ai_outline.is_empty()
    }

    /// The outline consumers should read: AI when non-empty, heuristic
    /// otherwise. Never both, so a document contributes a single competing
    /// set of headings.
    pub fn effective_outline(&self) -> &[Heading] {
        if self.has_ai_outline() {
            &self.ai_outline
        } else {
            &self.heuristic_outline
        }
    }
}

/// Immutable snapshot of the whole session.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Loaded documents in insertion order.
    pub documents: Vec<Document>,
    pub current: Option<DocumentId>,
    pub selection: Option<Selection>,
    pub relevant_sections: Vec<RelevantSection>,
    pub insights: Option<String>,
    pub audio: Option<Vec<u8>>,
    pub operations: Operations,
}

impl AppState {
    pub fn document(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| &d.id == id)
    }

    /// Documents other than `id`, in insertion order.
    pub fn other_documents<'a>(
        &'a self,
        id: &'a DocumentId,
    ) -> impl Iterator<Item = &'a Document> + 'a {
        self.documents.iter().filter(move |d| &d.id != id)
    }

    /// Documents that still lack a non-empty AI outline (the retry set).
    pub fn documents_without_ai_outline(&self) -> Vec<DocumentId> {
        self.documents
            .iter()
            .filter(|d| !d.has_ai_outline())
            .map(|d| d.id.clone())
            .collect()
    }
}

/// Every mutation the store accepts.
#[derive(Debug)]
pub enum Event {
    /// Ingest a batch. Ids already present are replaced in place (same
    /// identity means same document); when nothing is current the first
    /// document of the batch becomes current.
    AddDocuments(Vec<Document>),
    /// Remove one document, releasing its transient resource. Removing the
    /// current document clears the current pointer.
    RemoveDocument(DocumentId),
    SetCurrent(Option<DocumentId>),
    SetSelection(Option<Selection>),
    /// The extraction batch settled: AI outlines per document id. Unknown
    /// ids are ignored (the document was removed mid-batch).
    AiOutlinesReady(Vec<(DocumentId, Vec<Heading>)>),
    SetRelevantSections(Vec<RelevantSection>),
    SetInsights(Option<String>),
    SetAudio(Option<Vec<u8>>),
    /// Invalidate everything derived from the previous selection.
    ClearDerived,
    /// Marks a concern in progress and clears its previous error.
    OperationStarted(Concern),
    OperationSucceeded(Concern),
    OperationFailed(Concern, String),
    ClearError(Concern),
}

/// Apply one event to a snapshot, producing the next snapshot.
pub fn reduce(mut state: AppState, event: Event) -> AppState {
    match event {
        Event::AddDocuments(batch) => {
            let first_id = batch.first().map(|d| d.id.clone());
            for doc in batch {
                if let Some(existing) = state.documents.iter_mut().find(|d| d.id == doc.id) {
                    *existing = doc;
                } else {
                    state.documents.push(doc);
                }
            }
            if state.current.is_none() {
                state.current = first_id;
            }
            state
        }

        Event::RemoveDocument(id) => {
            if let Some(pos) = state.documents.iter().position(|d| d.id == id) {
                let doc = state.documents.remove(pos);
                if let Some(resource) = &doc.resource {
                    resource.release();
                }
            }
            if state.current.as_ref() == Some(&id) {
                state.current = None;
            }
            state
        }

        Event::SetCurrent(id) => {
            state.current = id;
            state
        }

        Event::SetSelection(selection) => {
            state.selection = selection;
            state
        }

        Event::AiOutlinesReady(outlines) => {
            for (id, outline) in outlines {
                if let Some(doc) = state.documents.iter_mut().find(|d| d.id == id) {
                    doc.ai_outline = outline;
                }
            }
            state
        }

        Event::SetRelevantSections(sections) => {
            state.relevant_sections = sections;
            state
        }

        Event::SetInsights(insights) => {
            state.insights = insights;
            state
        }

        Event::SetAudio(audio) => {
            state.audio = audio;
            state
        }

        Event::ClearDerived => {
            state.relevant_sections.clear();
            state.insights = None;
            state.audio = None;
            state
        }

        Event::OperationStarted(concern) => {
            let op = state.operations.get_mut(concern);
            op.in_progress = true;
            op.error = None;
            state
        }

        Event::OperationSucceeded(concern) => {
            state.operations.get_mut(concern).in_progress = false;
            state
        }

        Event::OperationFailed(concern, message) => {
            let op = state.operations.get_mut(concern);
            op.in_progress = false;
            op.error = Some(message);
            state
        }

        Event::ClearError(concern) => {
            state.operations.get_mut(concern).error = None;
            state
        }
    }
}
