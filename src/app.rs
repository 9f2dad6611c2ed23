use std::path::{Path, PathBuf};

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::{JoinError, JoinHandle};

use crate::api::{ApiError, BackendClient, Document};
use crate::session::Session;

/// The backend rejects anything larger with a 413; screening here saves
/// a doomed upload.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Library,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    LocalFiles,
    Documents,
}

/// The single in-flight backend request. Holding at most one of these is
/// what keeps network operations serialized.
pub enum ApiTask {
    Refresh(JoinHandle<Result<Vec<Document>, ApiError>>),
    Upload {
        file_name: String,
        handle: JoinHandle<Result<String, ApiError>>,
    },
    Ask(JoinHandle<Result<String, ApiError>>),
    Delete {
        id: String,
        handle: JoinHandle<Result<(), ApiError>>,
    },
}

impl ApiTask {
    fn is_finished(&self) -> bool {
        match self {
            ApiTask::Refresh(handle) => handle.is_finished(),
            ApiTask::Upload { handle, .. } => handle.is_finished(),
            ApiTask::Ask(handle) => handle.is_finished(),
            ApiTask::Delete { handle, .. } => handle.is_finished(),
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    pub session: Session,
    pub client: BackendClient,

    // Library state
    pub local_files: Vec<PathBuf>,
    pub local_state: ListState,
    pub documents_state: ListState,

    // Chat state
    pub question_input: String,
    pub question_cursor: usize, // cursor position in question_input
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    pub api_task: Option<ApiTask>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub local_area: Option<Rect>,
    pub documents_area: Option<Rect>,
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(client: BackendClient) -> Self {
        let local_files = scan_local_pdfs(Path::new("."));
        let mut local_state = ListState::default();
        if !local_files.is_empty() {
            local_state.select(Some(0));
        }

        let mut app = Self {
            should_quit: false,
            screen: Screen::Library,
            input_mode: InputMode::Normal,
            focus: FocusPane::LocalFiles,

            session: Session::new(),
            client,

            local_files,
            local_state,
            documents_state: ListState::default(),

            question_input: String::new(),
            question_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            api_task: None,
            animation_frame: 0,

            local_area: None,
            documents_area: None,
            chat_area: None,
        };

        // Fetch the document list on entry to the unselected state.
        app.refresh_documents();
        app
    }

    // --- backend requests ---------------------------------------------

    pub fn refresh_documents(&mut self) {
        if self.api_task.is_some() || !self.session.begin_refresh() {
            return;
        }
        let client = self.client.clone();
        self.api_task = Some(ApiTask::Refresh(tokio::spawn(async move {
            client.list_files().await
        })));
    }

    pub fn start_upload(&mut self) {
        if self.api_task.is_some() {
            return;
        }
        let Some(path) = self.session.begin_upload() else {
            if self.session.pending_upload().is_none() {
                self.session.set_notice("Select a PDF file first (Enter on a local file).");
            }
            return;
        };
        let file_name = display_file_name(&path);
        let client = self.client.clone();
        let name_for_task = file_name.clone();
        self.api_task = Some(ApiTask::Upload {
            file_name,
            handle: tokio::spawn(async move {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| ApiError::Task(format!("could not read {}: {e}", path.display())))?;
                client.upload(&name_for_task, bytes).await
            }),
        });
    }

    pub fn start_ask(&mut self) {
        if self.api_task.is_some() {
            return;
        }
        let Some(file_id) = self.session.begin_ask(&self.question_input) else {
            return;
        };
        let question = self.question_input.trim().to_string();
        self.question_input.clear();
        self.question_cursor = 0;
        self.scroll_chat_to_bottom();

        let client = self.client.clone();
        self.api_task = Some(ApiTask::Ask(tokio::spawn(async move {
            client.ask(&file_id, &question).await
        })));
    }

    pub fn start_delete(&mut self) {
        if self.api_task.is_some() {
            return;
        }
        let Some(id) = self.selected_document_entry().map(|d| d.id.clone()) else {
            return;
        };
        if !self.session.begin_delete(&id) {
            return;
        }
        let client = self.client.clone();
        let id_for_task = id.clone();
        self.api_task = Some(ApiTask::Delete {
            id,
            handle: tokio::spawn(async move { client.delete_file(&id_for_task).await }),
        });
    }

    /// Called on every tick: folds a finished request back into the
    /// session. In-flight requests are never cancelled; they complete or
    /// fault here.
    pub async fn poll_api_task(&mut self) {
        let Some(task) = self.api_task.take() else {
            return;
        };
        if !task.is_finished() {
            self.api_task = Some(task);
            return;
        }

        match task {
            ApiTask::Refresh(handle) => {
                self.session.finish_refresh(flatten(handle.await));
                self.clamp_document_cursor();
            }
            ApiTask::Upload { file_name, handle } => {
                self.session.finish_upload(file_name, flatten(handle.await));
                self.clamp_document_cursor();
                if self.session.selected_id().is_some() {
                    // Straight into the chat for the new document.
                    self.screen = Screen::Chat;
                    self.input_mode = InputMode::Editing;
                    self.chat_scroll = 0;
                }
            }
            ApiTask::Ask(handle) => {
                self.session.finish_ask(flatten(handle.await));
                self.scroll_chat_to_bottom();
            }
            ApiTask::Delete { id, handle } => {
                self.session.finish_delete(&id, flatten(handle.await));
                self.clamp_document_cursor();
                if self.screen == Screen::Chat && self.session.selected_id().is_none() {
                    self.screen = Screen::Library;
                    self.input_mode = InputMode::Normal;
                }
            }
        }
    }

    // --- library navigation -------------------------------------------

    pub fn selected_local_file(&self) -> Option<&PathBuf> {
        self.local_state.selected().and_then(|i| self.local_files.get(i))
    }

    pub fn selected_document_entry(&self) -> Option<&Document> {
        self.documents_state
            .selected()
            .and_then(|i| self.session.documents().get(i))
    }

    pub fn nav_down(&mut self) {
        match self.focus {
            FocusPane::LocalFiles => nav_list_down(&mut self.local_state, self.local_files.len()),
            FocusPane::Documents => {
                nav_list_down(&mut self.documents_state, self.session.documents().len())
            }
        }
    }

    pub fn nav_up(&mut self) {
        match self.focus {
            FocusPane::LocalFiles => nav_list_up(&mut self.local_state),
            FocusPane::Documents => nav_list_up(&mut self.documents_state),
        }
    }

    pub fn nav_first(&mut self) {
        let (state, len) = match self.focus {
            FocusPane::LocalFiles => (&mut self.local_state, self.local_files.len()),
            FocusPane::Documents => (&mut self.documents_state, self.session.documents().len()),
        };
        if len > 0 {
            state.select(Some(0));
        }
    }

    pub fn nav_last(&mut self) {
        let (state, len) = match self.focus {
            FocusPane::LocalFiles => (&mut self.local_state, self.local_files.len()),
            FocusPane::Documents => (&mut self.documents_state, self.session.documents().len()),
        };
        if len > 0 {
            state.select(Some(len - 1));
        }
    }

    pub fn rescan_local_files(&mut self) {
        self.local_files = scan_local_pdfs(Path::new("."));
        let len = self.local_files.len();
        match self.local_state.selected() {
            Some(i) if i >= len => self.local_state.select(len.checked_sub(1)),
            None if len > 0 => self.local_state.select(Some(0)),
            _ => {}
        }
    }

    fn clamp_document_cursor(&mut self) {
        let len = self.session.documents().len();
        match self.documents_state.selected() {
            Some(i) if i >= len => self.documents_state.select(len.checked_sub(1)),
            None if len > 0 => self.documents_state.select(Some(0)),
            _ => {}
        }
    }

    // --- chat ----------------------------------------------------------

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll the chat so the latest answer (or the loading placeholder)
    /// is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for turn in self.session.transcript() {
            // "You:" and "AI:" role lines plus wrapped content and a
            // blank separator.
            total_lines += 2;
            total_lines += wrapped_line_count(&turn.question, wrap_width);
            total_lines += wrapped_line_count(&turn.answer, wrap_width);
            total_lines += 1;
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }
}

fn nav_list_down(state: &mut ListState, len: usize) {
    if len > 0 {
        let i = state.selected().unwrap_or(0);
        state.select(Some((i + 1).min(len - 1)));
    }
}

fn nav_list_up(state: &mut ListState) {
    let i = state.selected().unwrap_or(0);
    state.select(Some(i.saturating_sub(1)));
}

fn wrapped_line_count(text: &str, wrap_width: usize) -> u16 {
    let mut lines = 0u16;
    for line in text.lines() {
        // Character count, not byte length, for UTF-8 content.
        let chars = line.chars().count();
        if chars == 0 {
            lines += 1;
        } else {
            lines += ((chars / wrap_width.max(1)) + 1) as u16;
        }
    }
    lines.max(1)
}

fn flatten<T>(joined: Result<Result<T, ApiError>, JoinError>) -> Result<T, ApiError> {
    match joined {
        Ok(result) => result,
        Err(err) => Err(ApiError::Task(err.to_string())),
    }
}

fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// List the `.pdf` files in a directory, sorted by name. Anything else
/// the backend would reject with a 400, so it is not offered.
pub fn scan_local_pdfs(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && has_pdf_extension(p))
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Screen a file before it becomes the pending upload, mirroring the
/// backend's own checks (extension, 10 MiB cap).
pub fn validate_upload(path: &Path) -> Result<(), String> {
    if !has_pdf_extension(path) {
        return Err("Invalid file type. Only PDF files are allowed.".to_string());
    }
    let metadata = std::fs::metadata(path)
        .map_err(|e| format!("Could not read {}: {e}", path.display()))?;
    if metadata.len() > MAX_UPLOAD_BYTES {
        return Err("File too large. Maximum size is 10MB.".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_finds_only_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.pdf"), b"%PDF-1.4").unwrap();
        fs::write(dir.path().join("NOTES2.PDF"), b"%PDF-1.4").unwrap();
        fs::write(dir.path().join("readme.txt"), b"hello").unwrap();
        fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let files = scan_local_pdfs(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| has_pdf_extension(p) && p.is_file()));
    }

    #[test]
    fn scan_of_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(scan_local_pdfs(&missing).is_empty());
    }

    #[test]
    fn validate_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readme.txt");
        fs::write(&path, b"hello").unwrap();

        let err = validate_upload(&path).unwrap_err();
        assert!(err.contains("Only PDF files"));
    }

    #[test]
    fn validate_rejects_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        let file = fs::File::create(&path).unwrap();
        file.set_len(MAX_UPLOAD_BYTES + 1).unwrap();

        let err = validate_upload(&path).unwrap_err();
        assert!(err.contains("too large"));
    }

    #[test]
    fn validate_accepts_a_small_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();
        assert!(validate_upload(&path).is_ok());
    }

    #[test]
    fn wrapped_line_count_estimates_wrapping() {
        assert_eq!(wrapped_line_count("short", 40), 1);
        assert_eq!(wrapped_line_count(&"x".repeat(100), 40), 3);
        assert_eq!(wrapped_line_count("a\nb", 40), 2);
    }
}
