//! Session state for the upload → select → chat flow.
//!
//! The TUI and the one-shot CLI both talk to the backend through
//! [`crate::api::BackendClient`]; this module holds the state those calls
//! read from and write back into. Network work happens elsewhere — every
//! operation here is a `begin_*` transition that gates on the busy flag
//! or a `finish_*` transition that folds a result back in, so the whole
//! state machine is testable without a server.

use std::path::{Path, PathBuf};

use crate::api::{ApiError, Document};

/// Placeholder answer shown while an ask is in flight.
pub const LOADING_PLACEHOLDER: &str = "Loading...";

/// Answer text when the ask request never reached the backend.
pub const ASK_TRANSPORT_ERROR: &str = "An error occurred while fetching the answer.";

/// One question/answer exchange tied to the selected document.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// Client-side session: cached document list, current selection, chat
/// transcript, and the single-flight busy flag.
///
/// Invariant: at most one network operation is in flight at a time. A
/// `begin_*` call that returns a "go" value sets `busy`; the matching
/// `finish_*` call clears it on every path.
#[derive(Default)]
pub struct Session {
    documents: Vec<Document>,
    selected: Option<String>,
    transcript: Vec<ChatTurn>,
    pending_upload: Option<PathBuf>,
    busy: bool,
    notice: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_document(&self) -> Option<&Document> {
        let id = self.selected.as_deref()?;
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn pending_upload(&self) -> Option<&Path> {
        self.pending_upload.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Inline message for the user (upload/delete failures and the like).
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    // --- document list -------------------------------------------------

    pub fn begin_refresh(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        true
    }

    /// Success replaces the cached list. Failure leaves it as it was and
    /// logs the condition; the listing is refreshed again on demand, never
    /// retried automatically.
    pub fn finish_refresh(&mut self, result: Result<Vec<Document>, ApiError>) {
        self.busy = false;
        match result {
            Ok(documents) => self.documents = documents,
            Err(err) => log::warn!("could not fetch the document list: {err}"),
        }
    }

    // --- upload --------------------------------------------------------

    /// Store the file chosen for upload. No side effect until
    /// [`Session::begin_upload`].
    pub fn select_for_upload(&mut self, path: PathBuf) {
        self.pending_upload = Some(path);
    }

    pub fn clear_pending_upload(&mut self) {
        self.pending_upload = None;
    }

    /// Returns the path to send when an upload may start: a pending file
    /// is set and nothing is in flight.
    pub fn begin_upload(&mut self) -> Option<PathBuf> {
        if self.busy {
            return None;
        }
        let path = self.pending_upload.clone()?;
        self.busy = true;
        Some(path)
    }

    /// A successful upload selects the new document and starts an empty
    /// transcript. Failure surfaces a notice and stays unselected.
    pub fn finish_upload(&mut self, file_name: String, result: Result<String, ApiError>) {
        self.busy = false;
        match result {
            Ok(id) => {
                self.documents.push(Document {
                    id: id.clone(),
                    name: file_name,
                    upload_date: None,
                });
                self.pending_upload = None;
                self.selected = Some(id);
                self.transcript.clear();
                self.notice = None;
            }
            Err(err) => self.notice = Some(format!("Upload failed: {err}")),
        }
    }

    // --- selection -----------------------------------------------------

    /// Select a document already in the cached list. Always starts a new
    /// empty transcript; the backend keeps no chat history. No network.
    pub fn select_existing(&mut self, id: &str) -> bool {
        if !self.documents.iter().any(|d| d.id == id) {
            return false;
        }
        self.selected = Some(id.to_string());
        self.transcript.clear();
        true
    }

    // --- delete --------------------------------------------------------

    pub fn begin_delete(&mut self, id: &str) -> bool {
        if self.busy || !self.documents.iter().any(|d| d.id == id) {
            return false;
        }
        self.busy = true;
        true
    }

    /// Success drops the document from the cache; deleting the selected
    /// document returns the session to the unselected state. Failure
    /// mutates nothing locally.
    pub fn finish_delete(&mut self, id: &str, result: Result<(), ApiError>) {
        self.busy = false;
        match result {
            Ok(()) => {
                self.documents.retain(|d| d.id != id);
                if self.selected.as_deref() == Some(id) {
                    self.selected = None;
                    self.transcript.clear();
                }
            }
            Err(err) => self.notice = Some(format!("Delete failed: {err}")),
        }
    }

    // --- ask -----------------------------------------------------------

    /// Append the question with a placeholder answer and return the
    /// document id to ask about. `None` when there is no selection, the
    /// question is blank, or a request is already in flight — starting an
    /// ask while busy is a no-op.
    pub fn begin_ask(&mut self, question: &str) -> Option<String> {
        if self.busy {
            return None;
        }
        let question = question.trim();
        if question.is_empty() {
            return None;
        }
        let id = self.selected.clone()?;
        self.transcript.push(ChatTurn {
            question: question.to_string(),
            answer: LOADING_PLACEHOLDER.to_string(),
        });
        self.busy = true;
        Some(id)
    }

    /// Replace the placeholder with the answer, the backend's `detail`
    /// message, or the generic transport error.
    pub fn finish_ask(&mut self, result: Result<String, ApiError>) {
        self.busy = false;
        let answer = match result {
            Ok(text) => text,
            Err(ApiError::Backend { detail, .. }) => format!("Error: {detail}"),
            Err(_) => ASK_TRANSPORT_ERROR.to_string(),
        };
        if let Some(turn) = self.transcript.last_mut() {
            turn.answer = answer;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn doc(id: &str, name: &str) -> Document {
        Document {
            id: id.to_string(),
            name: name.to_string(),
            upload_date: None,
        }
    }

    fn session_with_docs(docs: Vec<Document>) -> Session {
        let mut session = Session::new();
        assert!(session.begin_refresh());
        session.finish_refresh(Ok(docs));
        session
    }

    fn backend_error(detail: &str) -> ApiError {
        ApiError::Backend {
            status: StatusCode::NOT_FOUND,
            detail: detail.to_string(),
        }
    }

    #[test]
    fn transcript_is_empty_after_every_selection() {
        let mut session = session_with_docs(vec![doc("a", "a.pdf"), doc("b", "b.pdf")]);

        for id in ["a", "b", "a"] {
            assert!(session.select_existing(id));
            let question = session.begin_ask("anything?").is_some();
            assert!(question);
            session.finish_ask(Ok("answer".to_string()));
            assert!(session.select_existing(id));
            assert!(session.transcript().is_empty());
        }
    }

    #[test]
    fn selecting_an_unknown_id_is_rejected() {
        let mut session = session_with_docs(vec![doc("a", "a.pdf")]);
        assert!(!session.select_existing("ghost"));
        assert!(session.selected_id().is_none());
    }

    #[test]
    fn second_ask_while_busy_is_a_noop() {
        let mut session = session_with_docs(vec![doc("a", "a.pdf")]);
        session.select_existing("a");

        assert!(session.begin_ask("first?").is_some());
        assert!(session.is_busy());
        assert!(session.begin_ask("second?").is_none());
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn upload_success_selects_the_new_document() {
        let mut session = Session::new();
        session.select_for_upload(PathBuf::from("notes.pdf"));

        let path = session.begin_upload().expect("upload should start");
        assert_eq!(path, PathBuf::from("notes.pdf"));
        assert!(session.is_busy());

        session.finish_upload("notes.pdf".to_string(), Ok("doc1".to_string()));
        assert!(!session.is_busy());
        assert_eq!(session.selected_id(), Some("doc1"));
        assert!(session.transcript().is_empty());
        assert!(session.documents().iter().any(|d| d.id == "doc1"));
        assert!(session.pending_upload().is_none());
    }

    #[test]
    fn upload_failure_stays_unselected() {
        let mut session = Session::new();
        session.select_for_upload(PathBuf::from("notes.pdf"));
        session.begin_upload().unwrap();

        session.finish_upload("notes.pdf".to_string(), Err(backend_error("invalid file type")));
        assert!(!session.is_busy());
        assert!(session.selected_id().is_none());
        assert!(session.notice().unwrap().contains("invalid file type"));
        // The pending file is kept so the user can retry.
        assert!(session.pending_upload().is_some());
    }

    #[test]
    fn upload_without_pending_file_does_not_start() {
        let mut session = Session::new();
        assert!(session.begin_upload().is_none());
        assert!(!session.is_busy());
    }

    #[test]
    fn ask_success_replaces_the_placeholder() {
        let mut session = session_with_docs(vec![doc("doc1", "notes.pdf")]);
        session.select_existing("doc1");

        session.begin_ask("What is X?").unwrap();
        assert_eq!(session.transcript().last().unwrap().answer, LOADING_PLACEHOLDER);

        session.finish_ask(Ok("X is Y".to_string()));
        let turn = session.transcript().last().unwrap();
        assert_eq!(turn.question, "What is X?");
        assert_eq!(turn.answer, "X is Y");
        assert!(!session.is_busy());
    }

    #[test]
    fn ask_backend_error_surfaces_the_detail() {
        let mut session = session_with_docs(vec![doc("doc1", "notes.pdf")]);
        session.select_existing("doc1");

        session.begin_ask("What is X?").unwrap();
        session.finish_ask(Err(backend_error("file not found")));

        let turn = session.transcript().last().unwrap();
        assert!(turn.answer.contains("file not found"));
        assert!(!session.is_busy());
    }

    #[test]
    fn ask_transport_fault_uses_the_generic_message() {
        let mut session = session_with_docs(vec![doc("doc1", "notes.pdf")]);
        session.select_existing("doc1");

        session.begin_ask("What is X?").unwrap();
        session.finish_ask(Err(ApiError::Task("connection reset".to_string())));

        assert_eq!(session.transcript().last().unwrap().answer, ASK_TRANSPORT_ERROR);
        assert!(!session.is_busy());
    }

    #[test]
    fn ask_requires_a_selection_and_a_question() {
        let mut session = session_with_docs(vec![doc("doc1", "notes.pdf")]);
        assert!(session.begin_ask("question?").is_none());

        session.select_existing("doc1");
        assert!(session.begin_ask("").is_none());
        assert!(session.begin_ask("   ").is_none());
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn delete_success_removes_the_document() {
        let mut session = session_with_docs(vec![doc("doc1", "a.pdf"), doc("doc2", "b.pdf")]);

        assert!(session.begin_delete("doc1"));
        session.finish_delete("doc1", Ok(()));
        assert!(!session.documents().iter().any(|d| d.id == "doc1"));
        assert_eq!(session.documents().len(), 1);
    }

    #[test]
    fn deleting_the_selected_document_deselects() {
        let mut session = session_with_docs(vec![doc("doc1", "a.pdf")]);
        session.select_existing("doc1");

        session.begin_delete("doc1");
        session.finish_delete("doc1", Ok(()));
        assert!(session.selected_id().is_none());
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn delete_failure_keeps_the_list() {
        let mut session = session_with_docs(vec![doc("doc1", "a.pdf")]);

        session.begin_delete("doc1");
        session.finish_delete("doc1", Err(backend_error("file not found")));
        assert!(session.documents().iter().any(|d| d.id == "doc1"));
        assert!(session.notice().unwrap().contains("file not found"));
    }

    #[test]
    fn refresh_failure_leaves_the_list_unchanged() {
        let mut session = session_with_docs(vec![doc("doc1", "a.pdf")]);

        assert!(session.begin_refresh());
        session.finish_refresh(Err(ApiError::Task("boom".to_string())));
        assert_eq!(session.documents().len(), 1);
        assert!(!session.is_busy());
    }

    #[test]
    fn operations_refuse_to_start_while_busy() {
        let mut session = session_with_docs(vec![doc("doc1", "a.pdf")]);
        session.select_for_upload(PathBuf::from("x.pdf"));
        session.begin_ask("?"); // no selection, stays idle
        session.select_existing("doc1");
        session.begin_ask("question?").unwrap();

        assert!(!session.begin_refresh());
        assert!(!session.begin_delete("doc1"));
        assert!(session.begin_upload().is_none());
    }
}
