use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::app::{ApiTask, App, FocusPane, InputMode, Screen};
use crate::session::LOADING_PLACEHOLDER;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let notice_height = if app.session.notice().is_some() { 1 } else { 0 };

    // Main layout: header, body, notice line (when present), footer
    let [header_area, body_area, notice_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(notice_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Library => render_library_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    if let Some(notice) = app.session.notice() {
        let line = Paragraph::new(format!(" {} ", notice))
            .style(Style::default().fg(Color::Black).bg(Color::Yellow));
        frame.render_widget(line, notice_area);
    }

    render_footer(app, frame, footer_area);
}

fn busy_label(app: &App) -> Option<&'static str> {
    match app.api_task.as_ref()? {
        ApiTask::Refresh(_) => Some("refreshing"),
        ApiTask::Upload { .. } => Some("uploading"),
        ApiTask::Ask(_) => Some("asking"),
        ApiTask::Delete { .. } => Some("deleting"),
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let busy_indicator = match busy_label(app) {
        Some(label) => {
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            format!(" [{}{}]", label, dots)
        }
        None => String::new(),
    };

    let document_count = app.session.documents().len();
    let count_indicator = if document_count > 0 {
        format!(" [{} uploaded]", document_count)
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(" PDF Q&A ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(count_indicator, Style::default().fg(Color::DarkGray)),
        Span::styled(busy_indicator, Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Library => " LIBRARY ",
        Screen::Chat => " CHAT ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match (app.screen, app.input_mode) {
        (Screen::Library, _) => {
            let mut hints = vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" nav ", label_style),
                Span::styled(" Tab ", key_style),
                Span::styled(" pane ", label_style),
            ];
            match app.focus {
                FocusPane::LocalFiles => hints.extend(vec![
                    Span::styled(" Enter ", key_style),
                    Span::styled(" select ", label_style),
                    Span::styled(" u ", key_style),
                    Span::styled(" upload ", label_style),
                ]),
                FocusPane::Documents => hints.extend(vec![
                    Span::styled(" Enter ", key_style),
                    Span::styled(" open ", label_style),
                    Span::styled(" d ", key_style),
                    Span::styled(" delete ", label_style),
                ]),
            }
            hints.extend(vec![
                Span::styled(" r ", key_style),
                Span::styled(" refresh ", label_style),
            ]);
            if app.session.selected_id().is_some() {
                hints.extend(vec![
                    Span::styled(" a ", key_style),
                    Span::styled(" chat ", label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
        (Screen::Chat, InputMode::Normal) => vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" library ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (Screen::Chat, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_library_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    // Local files on the left, uploaded documents on the right
    let [local_area, documents_area] = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
    ])
    .areas(area);

    // Store areas for mouse hit-testing
    app.local_area = Some(local_area);
    app.documents_area = Some(documents_area);
    app.chat_area = None;

    render_local_files(app, frame, local_area);
    render_documents(app, frame, documents_area);
}

fn render_local_files(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::LocalFiles;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Local PDFs ");

    if app.local_files.is_empty() {
        let placeholder = Paragraph::new("No .pdf files in the current directory.\nPress 'r' to rescan.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let pending = app.session.pending_upload();
    let items: Vec<ListItem> = app
        .local_files
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            if pending == Some(path.as_path()) {
                ListItem::new(Line::from(vec![
                    Span::styled(" * ", Style::default().fg(Color::Yellow).bold()),
                    Span::styled(name, Style::default().fg(Color::Yellow)),
                    Span::styled("  (pending upload)", Style::default().fg(Color::DarkGray)),
                ]))
            } else {
                ListItem::new(format!("   {} ", name))
            }
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.local_state);
}

fn render_documents(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Documents;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Uploaded Documents ({}) ", app.session.documents().len()));

    if app.session.documents().is_empty() {
        let placeholder = Paragraph::new("Nothing uploaded yet.\nSelect a local PDF and press 'u'.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let selected_id = app.session.selected_id().map(str::to_string);
    let items: Vec<ListItem> = app
        .session
        .documents()
        .iter()
        .map(|doc| {
            let name_style = if selected_id.as_deref() == Some(doc.id.as_str()) {
                Style::default().fg(Color::Green).bold()
            } else {
                Style::default()
            };
            let mut spans = vec![Span::styled(format!(" {} ", doc.name), name_style)];
            if let Some(date) = &doc.upload_date {
                spans.push(Span::styled(format!("({}) ", date), Style::default().fg(Color::DarkGray)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.documents_state);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    // Transcript on top, question input at the bottom
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.local_area = None;
    app.documents_area = None;
    app.chat_area = Some(chat_area);

    // Inner size minus borders, for scroll and wrap calculations
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let document_name = app
        .session
        .selected_document()
        .map(|d| d.name.clone())
        .or_else(|| app.session.selected_id().map(str::to_string))
        .unwrap_or_else(|| "no document".to_string());

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Chat: {} ", document_name));

    let busy = app.session.is_busy();
    let transcript = app.session.transcript();

    let chat_text = if transcript.is_empty() {
        Text::from(Span::styled(
            format!("Ask a question about {}...", document_name),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        let last = transcript.len() - 1;

        for (i, turn) in transcript.iter().enumerate() {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            for line in turn.question.lines() {
                lines.push(Line::from(line.to_string()));
            }
            lines.push(Line::default());

            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            if busy && i == last && turn.answer == LOADING_PLACEHOLDER {
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((app.animation_frame as usize) + 1);
                lines.push(Line::from(Span::styled(
                    format!("Loading{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            } else {
                for line in turn.answer.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            lines.push(Line::default());
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    // Question input - highlighted while editing
    let input_border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Ask a question (i to type) ");

    // Horizontal scrolling keeps the cursor visible in a narrow box.
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.question_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .question_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, input_area);

    if app.input_mode == InputMode::Editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}
