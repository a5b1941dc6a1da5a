use crate::app::{App, Focus, View};
use crate::keybindings::{Action, Context};
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Braille spinner, one frame per tick.
pub(super) const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if app.search_mode {
        Cow::Owned(format!(
            "/{}_  (Enter) search  (Esc) cancel",
            app.search_input
        ))
    } else if let Some(ticket) = app.model.populating() {
        let name = app
            .model
            .find(ticket.node_id)
            .map_or("node", |n| n.name.as_str());
        Cow::Owned(format!(
            "{} Generating topics for {}...",
            SPINNER[app.spinner_frame % SPINNER.len()],
            name
        ))
    } else {
        Cow::Owned(hints(app))
    };

    let paragraph = Paragraph::new(text).style(app.style("status_bar"));
    f.render_widget(paragraph, area);
}

/// Key hints for the current view, built from the live bindings so config
/// overrides show up.
fn hints(app: &App) -> String {
    let (context, actions): (Context, &[(Action, &str)]) = match (app.view, app.focus) {
        (View::Progress, _) => (
            Context::Progress,
            &[
                (Action::Select, "open topic"),
                (Action::Reload, "reload"),
                (Action::Back, "back"),
                (Action::Quit, "quit"),
            ],
        ),
        (View::Tree, Focus::Detail) => (
            Context::Detail,
            &[
                (Action::ScrollDown, "scroll"),
                (Action::Edit, "edit"),
                (Action::OpenReference, "open link"),
                (Action::CycleFocus, "tree"),
                (Action::ShowHelp, "help"),
                (Action::Quit, "quit"),
            ],
        ),
        (View::Tree, Focus::Tree) => (
            Context::Tree,
            &[
                (Action::Select, "select"),
                (Action::EnterSearch, "search"),
                (Action::Edit, "edit"),
                (Action::CreateChild, "new"),
                (Action::MarkMove, "mark"),
                (Action::Populate, "generate"),
                (Action::ShowHelp, "help"),
                (Action::Quit, "quit"),
            ],
        ),
    };

    let mut parts: Vec<String> = actions
        .iter()
        .filter_map(|(action, label)| {
            app.keybindings
                .key_for(*action, context)
                .map(|key| format!("[{}] {}", key, label))
        })
        .collect();

    if let Some(name) = app.move_mark.and_then(|id| app.model.find(id)) {
        parts.insert(0, format!("Moving {}:", name.name));
    }
    parts.join("  ")
}
