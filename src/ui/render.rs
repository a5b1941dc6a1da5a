//! Render functions for the TUI.
//!
//! Dispatches to the current view, then draws overlays on top: help, the
//! delete confirmation and any open dialog.

use crate::app::{App, AskState, ConfirmAction, Dialog, EditField, View};
use crate::util::{single_line, truncate_to_width};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::{detail, help, progress, status, tree};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    match app.view {
        View::Tree => {
            let panels = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
                .split(chunks[0]);
            tree::render(f, app, panels[0]);
            detail::render(f, app, panels[1]);
        }
        View::Progress => progress::render(f, app, chunks[0]),
    }
    status::render(f, app, chunks[1]);

    if app.show_help {
        help::render(f, app);
    }

    if let Some(ref confirm) = app.pending_confirm {
        render_confirm_overlay(f, app, confirm);
    }

    match &app.dialog {
        Some(Dialog::Edit { field, saving }) => render_edit_overlay(f, app, *field, *saving),
        Some(Dialog::Create {
            parent_name, input, ..
        }) => render_create_overlay(f, app, parent_name.as_deref(), input),
        Some(Dialog::Ask(state)) => render_ask_overlay(f, app, state),
        None => {}
    }
}

/// Fixed-size rectangle centered in `area`, shrunk to fit.
fn centered_fixed(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn dialog_block<'a>(app: &App, title: impl Into<Line<'a>>) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("dialog_border"))
        .title(title)
}

fn render_confirm_overlay(f: &mut Frame, app: &App, confirm: &ConfirmAction) {
    let text = match confirm {
        ConfirmAction::Remove(pending) => format!(
            "Delete \"{}\"?\n\nIts subtopics will be removed too.\n\n(y) Confirm  (n/Esc) Cancel",
            truncate_to_width(&single_line(pending.name()), 40)
        ),
    };

    let overlay = centered_fixed(f.area(), 50, 7);
    if overlay.width < 10 || overlay.height < 5 {
        return;
    }
    f.render_widget(Clear, overlay);

    let paragraph = Paragraph::new(text)
        .block(dialog_block(app, " Confirm "))
        .alignment(Alignment::Center)
        .style(app.style("detail_body"));
    f.render_widget(paragraph, overlay);
}

/// Every field of the draft, the active one in full with a cursor.
fn render_edit_overlay(f: &mut Frame, app: &App, active: EditField, saving: bool) {
    let Some(draft) = app.model.draft() else {
        return;
    };
    let overlay = help::centered_rect(80, 80, f.area());
    if overlay.width < 20 || overlay.height < 8 {
        return;
    }
    f.render_widget(Clear, overlay);

    let value_width = overlay.width.saturating_sub(18) as usize;
    let mut lines: Vec<Line> = Vec::new();
    for field in EditField::ALL {
        let value = field.value(&draft.fields);
        if field == active {
            lines.push(Line::from(Span::styled(
                format!("> {}", field.label()),
                app.style("detail_label"),
            )));
            let mut body: Vec<Line> = value
                .split('\n')
                .map(|l| Line::from(Span::styled(format!("  {}", l), app.style("dialog_input"))))
                .collect();
            if let Some(last) = body.last_mut() {
                last.push_span(Span::styled("_", app.style("dialog_input")));
            }
            lines.extend(body);
        } else {
            let preview = truncate_to_width(&single_line(value), value_width).into_owned();
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<14}", field.label()), app.style("detail_muted")),
                Span::styled(preview, app.style("detail_body")),
            ]));
        }
    }
    lines.push(Line::from(""));
    let footer = if saving {
        "Saving..."
    } else {
        "(Tab) Next field  (Ctrl+s) Save  (Esc) Cancel"
    };
    lines.push(Line::from(Span::styled(footer, app.style("detail_muted"))));

    let title = format!(" Edit {} ", truncate_to_width(&single_line(&draft.original.name), 30));
    let paragraph = Paragraph::new(Text::from(lines))
        .block(dialog_block(app, title))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, overlay);
}

fn render_create_overlay(f: &mut Frame, app: &App, parent_name: Option<&str>, input: &str) {
    let prompt = match parent_name {
        Some(parent) => format!("New topic under {}:", truncate_to_width(&single_line(parent), 36)),
        None => "New root topic:".to_string(),
    };
    let text = Text::from(vec![
        Line::from(prompt),
        Line::from(""),
        Line::from(Span::styled(format!("> {}_", input), app.style("dialog_input"))),
        Line::from(""),
        Line::from(Span::styled("(Enter) Create  (Esc) Cancel", app.style("detail_muted"))),
    ]);

    let overlay = centered_fixed(f.area(), 56, 9);
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }
    f.render_widget(Clear, overlay);

    let paragraph = Paragraph::new(text)
        .block(dialog_block(app, " New Topic "))
        .style(app.style("detail_body"));
    f.render_widget(paragraph, overlay);
}

fn render_ask_overlay(f: &mut Frame, app: &App, state: &AskState) {
    let (title, text, scroll) = match state {
        AskState::Input { input } => (
            " Ask a Question ",
            Text::from(vec![
                Line::from("Question:"),
                Line::from(""),
                Line::from(Span::styled(format!("> {}_", input), app.style("dialog_input"))),
                Line::from(""),
                Line::from(Span::styled("(Enter) Ask  (Esc) Cancel", app.style("detail_muted"))),
            ]),
            0,
        ),
        AskState::Waiting { question } => (
            " Thinking ",
            Text::from(vec![
                Line::from(Span::styled(question.clone(), app.style("detail_heading"))),
                Line::from(""),
                Line::from(format!(
                    "{} Waiting for an answer...",
                    status::SPINNER[app.spinner_frame % status::SPINNER.len()]
                )),
                Line::from(""),
                Line::from(Span::styled("(Esc) Close", app.style("detail_muted"))),
            ]),
            0,
        ),
        AskState::Answered {
            question,
            answer,
            scroll,
        } => {
            let mut lines = vec![
                Line::from(Span::styled(question.clone(), app.style("detail_heading"))),
                Line::from(""),
            ];
            lines.extend(detail::render_markdown(answer, &app.theme));
            lines.push(Line::from(Span::styled(
                "(j/k) Scroll  (Esc) Close",
                app.style("detail_muted"),
            )));
            (" Answer ", Text::from(lines), *scroll)
        }
    };

    let overlay = help::centered_rect(70, 70, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }
    f.render_widget(Clear, overlay);

    let scroll = u16::try_from(scroll).unwrap_or(u16::MAX);
    let paragraph = Paragraph::new(text)
        .block(dialog_block(app, title))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .style(app.style("detail_body"));
    f.render_widget(paragraph, overlay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use crate::config::Config;
    use crate::tree::sync;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        screen_text(&terminal)
    }

    #[tokio::test]
    async fn test_too_small_message() {
        let mut app = App::new(Arc::new(MemoryApi::demo()), None, &Config::default());
        let screen = draw(&mut app, 40, 8).await;
        assert!(screen.contains("Terminal too small"));
    }

    #[tokio::test]
    async fn test_tree_view_shows_roots_and_detail() {
        let api = Arc::new(MemoryApi::demo());
        let mut app = App::new(api.clone(), None, &Config::default());
        app.model
            .apply_roots(sync::load_roots(api.as_ref()).await)
            .unwrap();
        app.move_cursor(1);

        let screen = draw(&mut app, 100, 30).await;
        assert!(screen.contains("Computer Science"));
        assert!(screen.contains("Physical Fitness"));
        assert!(screen.contains("Details"));
        assert!(screen.contains("[MATH]"));
    }

    #[tokio::test]
    async fn test_confirm_overlay_names_node() {
        let api = Arc::new(MemoryApi::demo());
        let mut app = App::new(api.clone(), None, &Config::default());
        app.model
            .apply_roots(sync::load_roots(api.as_ref()).await)
            .unwrap();
        let pending = app.model.request_remove(crate::api::NodeId(16)).unwrap();
        app.pending_confirm = Some(ConfirmAction::Remove(pending));

        let screen = draw(&mut app, 100, 30).await;
        assert!(screen.contains("Delete \"Physical Fitness\"?"));
    }
}
