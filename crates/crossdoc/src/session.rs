//! The session driver: owns the state snapshot and routes every mutation
//! through the reducer.
//!
//! Ingestion reads files, derives document identities, runs the heuristic
//! extraction pipeline, and stages a temp-file viewer copy per document.
//! Files that cannot be parsed are skipped and reported through the `files`
//! error slot with an "added N of M" message; parseable files still load.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crossdoc_core::state::{
    reduce, AppState, Concern, Document, Event, ReleasableResource,
};
use crossdoc_core::types::{DocumentId, Selection};

use crate::error::Error;
use crate::extract::run_extraction;
use crate::relevance::{refresh_relevance, Generation};
use crate::services::{AssistService, HeadingExtractionService, RankingService, SpeechService};

/// Temp-file copy of a document's bytes, standing in for the viewer
/// collaborator. Removed from disk exactly once when the document is
/// dropped from the session.
#[derive(Debug)]
pub struct ViewerHandle {
    path: PathBuf,
    released: AtomicBool,
}

impl ViewerHandle {
    pub fn stage(bytes: &[u8]) -> std::io::Result<Self> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(bytes)?;
        let path = file.into_temp_path().keep().map_err(|e| e.error)?;
        Ok(Self {
            path,
            released: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReleasableResource for ViewerHandle {
    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("failed to remove viewer copy {}: {e}", self.path.display());
        }
    }
}

pub struct Session {
    state: AppState,
    generation: Generation,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: AppState::default(),
            generation: Generation::default(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn dispatch(&mut self, event: Event) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, event);
    }

    /// Ingest a batch of files. Unreadable or unparseable entries are
    /// skipped; the `files` slot records "added N of M files" when any were.
    pub fn add_documents(&mut self, paths: &[PathBuf]) {
        self.dispatch(Event::OperationStarted(Concern::Files));

        let total = paths.len();
        let mut loaded = Vec::new();
        for path in paths {
            match load_document(path) {
                Ok(doc) => loaded.push(doc),
                Err(e) => log::warn!("skipping {}: {e}", path.display()),
            }
        }

        let added = loaded.len();
        if !loaded.is_empty() {
            self.dispatch(Event::AddDocuments(loaded));
        }

        if added < total {
            self.dispatch(Event::OperationFailed(
                Concern::Files,
                format!("added {added} of {total} files"),
            ));
        } else {
            self.dispatch(Event::OperationSucceeded(Concern::Files));
        }

        // The loaded set changed; in-flight relevance queries are stale.
        self.generation.invalidate();
    }

    pub fn remove_document(&mut self, id: &DocumentId) {
        self.dispatch(Event::RemoveDocument(id.clone()));
        self.dispatch(Event::ClearDerived);
        self.generation.invalidate();
    }

    /// Make `text` in document `id` the active selection, invalidating
    /// everything derived from the previous one.
    pub fn select(&mut self, id: &DocumentId, text: &str) -> Result<(), Error> {
        if self.state.document(id).is_none() {
            return Err(Error::DocumentNotFound(id.to_string()));
        }
        self.dispatch(Event::SetSelection(Some(Selection {
            document_id: id.clone(),
            text: text.to_string(),
        })));
        self.dispatch(Event::ClearDerived);
        self.generation.invalidate();
        Ok(())
    }

    /// Resolve a loaded document by display name or full id.
    pub fn find_document(&self, needle: &str) -> Option<DocumentId> {
        self.state
            .documents
            .iter()
            .find(|d| d.name == needle || d.id.as_str() == needle)
            .map(|d| d.id.clone())
    }

    pub async fn extract_outlines<S: HeadingExtractionService>(&mut self, service: &S) {
        let state = std::mem::take(&mut self.state);
        self.state = run_extraction(state, service).await;
    }

    pub async fn refresh_relevance<S: RankingService>(&mut self, service: &S) {
        let state = std::mem::take(&mut self.state);
        self.state = refresh_relevance(state, service, &self.generation).await;
    }

    /// Summarize the current selection against its relevant sections.
    pub async fn generate_insights<S: AssistService>(&mut self, service: &S) {
        let Some(selection) = self.state.selection.clone() else {
            self.dispatch(Event::OperationFailed(
                Concern::Insights,
                "no active selection".into(),
            ));
            return;
        };

        self.dispatch(Event::OperationStarted(Concern::Insights));
        let titles: Vec<String> = self
            .state
            .relevant_sections
            .iter()
            .map(|s| s.title.clone())
            .collect();

        match service.summarize_insights(&selection.text, &titles).await {
            Ok(text) => {
                self.dispatch(Event::SetInsights(Some(text)));
                self.dispatch(Event::OperationSucceeded(Concern::Insights));
            }
            Err(e) => self.dispatch(Event::OperationFailed(Concern::Insights, e.to_string())),
        }
    }

    /// Script and synthesize a narration of the current selection.
    pub async fn narrate<A: AssistService, S: SpeechService>(&mut self, assist: &A, speech: &S) {
        let Some(selection) = self.state.selection.clone() else {
            self.dispatch(Event::OperationFailed(
                Concern::Audio,
                "no active selection".into(),
            ));
            return;
        };

        self.dispatch(Event::OperationStarted(Concern::Audio));

        let result = async {
            let script = assist.narration_script(&selection.text).await?;
            speech.synthesize(&script).await
        }
        .await;

        match result {
            Ok(bytes) => {
                self.dispatch(Event::SetAudio(Some(bytes)));
                self.dispatch(Event::OperationSucceeded(Concern::Audio));
            }
            Err(e) => self.dispatch(Event::OperationFailed(Concern::Audio, e.to_string())),
        }
    }
}

fn load_document(path: &Path) -> Result<Document, Error> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| Error::Ingest(format!("{}: {e}", path.display())))?;
    let modified: DateTime<Utc> = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let bytes =
        std::fs::read(path).map_err(|e| Error::Ingest(format!("{}: {e}", path.display())))?;
    let extracted =
        pdf::extract_document(&bytes).map_err(|e| Error::Ingest(format!("{name}: {e}")))?;

    let resource = match ViewerHandle::stage(&bytes) {
        Ok(handle) => Some(Arc::new(handle) as Arc<dyn ReleasableResource>),
        Err(e) => {
            log::warn!("cannot stage viewer copy for {name}: {e}");
            None
        }
    };

    Ok(Document {
        id: DocumentId::derive(&name, metadata.len(), modified),
        name,
        bytes: Arc::new(bytes),
        pages: extracted.pages,
        heuristic_outline: extracted.outline,
        ai_outline: Vec::new(),
        resource,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;

    struct CannedAssist;

    impl AssistService for CannedAssist {
        async fn summarize_insights(
            &self,
            _selection: &str,
            section_titles: &[String],
        ) -> Result<String, ServiceError> {
            Ok(format!("summary over {} sections", section_titles.len()))
        }

        async fn narration_script(&self, _selection: &str) -> Result<String, ServiceError> {
            Ok("narration script".to_string())
        }
    }

    struct CannedSpeech;

    impl SpeechService for CannedSpeech {
        async fn synthesize(&self, _script: &str) -> Result<Vec<u8>, ServiceError> {
            Ok(vec![0x49, 0x44, 0x33])
        }
    }

    struct FailingSpeech;

    impl SpeechService for FailingSpeech {
        async fn synthesize(&self, _script: &str) -> Result<Vec<u8>, ServiceError> {
            Err(ServiceError::Speech("endpoint unreachable".into()))
        }
    }

    fn make_document(name: &str) -> Document {
        Document {
            id: DocumentId::from_raw(name),
            name: name.to_string(),
            bytes: Arc::new(Vec::new()),
            pages: vec!["text".to_string()],
            heuristic_outline: Vec::new(),
            ai_outline: Vec::new(),
            resource: None,
        }
    }

    #[test]
    fn test_unparseable_files_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let good_less = dir.path().join("not-a-pdf.pdf");
        std::fs::write(&good_less, b"plain text, not a pdf").unwrap();
        let missing = dir.path().join("missing.pdf");

        let mut session = Session::new();
        session.add_documents(&[good_less, missing]);

        assert!(session.state().documents.is_empty());
        assert_eq!(
            session.state().operations.get(Concern::Files).error.as_deref(),
            Some("added 0 of 2 files")
        );
    }

    #[test]
    fn test_select_unknown_document() {
        let mut session = Session::new();
        let err = session.select(&DocumentId::from_raw("nope"), "text");
        assert!(matches!(err, Err(Error::DocumentNotFound(_))));
    }

    #[test]
    fn test_find_document_by_name() {
        let mut session = Session::new();
        session.dispatch(Event::AddDocuments(vec![make_document("a.pdf")]));

        assert_eq!(
            session.find_document("a.pdf"),
            Some(DocumentId::from_raw("a.pdf"))
        );
        assert!(session.find_document("b.pdf").is_none());
    }

    #[test]
    fn test_viewer_handle_release_is_idempotent() {
        let handle = ViewerHandle::stage(b"content").unwrap();
        let path = handle.path().to_path_buf();
        assert!(path.exists());

        handle.release();
        assert!(!path.exists());
        handle.release();
    }

    #[tokio::test]
    async fn test_insights_require_a_selection() {
        let mut session = Session::new();
        session.generate_insights(&CannedAssist).await;

        let op = session.state().operations.get(Concern::Insights);
        assert_eq!(op.error.as_deref(), Some("no active selection"));
        assert!(session.state().insights.is_none());
    }

    #[tokio::test]
    async fn test_narration_stores_audio() {
        let mut session = Session::new();
        session.dispatch(Event::AddDocuments(vec![make_document("a.pdf")]));
        session.select(&DocumentId::from_raw("a.pdf"), "a passage").unwrap();

        session.narrate(&CannedAssist, &CannedSpeech).await;

        assert_eq!(session.state().audio.as_deref(), Some(&[0x49, 0x44, 0x33][..]));
        assert!(!session.state().operations.get(Concern::Audio).in_progress);
    }

    #[tokio::test]
    async fn test_narration_failure_is_audio_scoped() {
        let mut session = Session::new();
        session.dispatch(Event::AddDocuments(vec![make_document("a.pdf")]));
        session.select(&DocumentId::from_raw("a.pdf"), "a passage").unwrap();

        session.narrate(&CannedAssist, &FailingSpeech).await;

        let op = session.state().operations.get(Concern::Audio);
        assert!(op.error.is_some());
        assert!(session.state().audio.is_none());
        assert!(session.state().operations.get(Concern::Files).error.is_none());
    }
}
