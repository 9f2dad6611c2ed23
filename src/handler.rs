use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode, Screen};
use crate::app::validate_upload;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.poll_api_task().await;
            app.tick_animation();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // A keypress acknowledges whatever inline message is showing.
    if app.input_mode == InputMode::Normal {
        app.session.clear_notice();
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Library => handle_library_normal(app, key),
        Screen::Chat => handle_chat_normal(app, key),
    }
}

fn handle_library_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => app.nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.nav_up(),
        KeyCode::Char('g') => app.nav_first(),
        KeyCode::Char('G') => app.nav_last(),

        // Tab (or h/l) switches between the local-file and document panes
        KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') | KeyCode::Left | KeyCode::Right => {
            app.focus = match app.focus {
                FocusPane::LocalFiles => FocusPane::Documents,
                FocusPane::Documents => FocusPane::LocalFiles,
            };
        }

        // Enter: mark a local file for upload, or open an uploaded document
        KeyCode::Enter => match app.focus {
            FocusPane::LocalFiles => {
                if let Some(path) = app.selected_local_file().cloned() {
                    match validate_upload(&path) {
                        Ok(()) => app.session.select_for_upload(path),
                        Err(message) => app.session.set_notice(message),
                    }
                }
            }
            FocusPane::Documents => {
                if let Some(id) = app.selected_document_entry().map(|d| d.id.clone()) {
                    if app.session.select_existing(&id) {
                        app.screen = Screen::Chat;
                        app.input_mode = InputMode::Editing;
                        app.chat_scroll = 0;
                    }
                }
            }
        },

        // Upload the pending file
        KeyCode::Char('u') => app.start_upload(),

        // Delete the highlighted uploaded document
        KeyCode::Char('d') => {
            if app.focus == FocusPane::Documents {
                app.start_delete();
            }
        }

        // Refresh both panes
        KeyCode::Char('r') => {
            app.rescan_local_files();
            app.refresh_documents();
        }

        // Back to the chat for the selected document
        KeyCode::Char('a') => {
            if app.session.selected_id().is_some() {
                app.screen = Screen::Chat;
            }
        }

        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.screen = Screen::Library;
        }
        KeyCode::Char('q') => app.should_quit = true,

        // Start typing a question
        KeyCode::Char('i') | KeyCode::Char('/') => {
            app.input_mode = InputMode::Editing;
            app.question_cursor = app.question_input.chars().count();
        }

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(),
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    // Only the chat screen has a text input.
    if app.screen != Screen::Chat {
        app.input_mode = InputMode::Normal;
        return;
    }

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            // No-op while a request is in flight; the session gates it.
            app.session.clear_notice();
            app.start_ask();
        }
        KeyCode::Backspace => {
            if app.question_cursor > 0 {
                app.question_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.question_input, app.question_cursor);
                app.question_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.question_input.chars().count();
            if app.question_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.question_input, app.question_cursor);
                app.question_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.question_cursor = app.question_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.question_input.chars().count();
            app.question_cursor = (app.question_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.question_cursor = 0;
        }
        KeyCode::End => {
            app.question_cursor = app.question_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.question_input, app.question_cursor);
            app.question_input.insert(byte_pos, c);
            app.question_cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_local = app.local_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_documents = app.documents_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => match app.screen {
            Screen::Library => {
                if in_local {
                    app.focus = FocusPane::LocalFiles;
                    app.nav_down();
                } else if in_documents {
                    app.focus = FocusPane::Documents;
                    app.nav_down();
                }
            }
            Screen::Chat => {
                if in_chat {
                    app.scroll_chat_down();
                }
            }
        },
        MouseEventKind::ScrollUp => match app.screen {
            Screen::Library => {
                if in_local {
                    app.focus = FocusPane::LocalFiles;
                    app.nav_up();
                } else if in_documents {
                    app.focus = FocusPane::Documents;
                    app.nav_up();
                }
            }
            Screen::Chat => {
                if in_chat {
                    app.scroll_chat_up();
                }
            }
        },
        _ => {}
    }
}
