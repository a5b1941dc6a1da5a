//! Input handling for the TUI.
//!
//! Processes keyboard input and dispatches to the handler for the current
//! overlay, mode or view.

use crate::api::NodeId;
use crate::app::{
    App, AppEvent, AskState, ConfirmAction, Dialog, EditField, Focus, ProgressState, View,
};
use crate::keybindings::{Action as KbAction, Context as KbContext};
use crate::util::{extract_links, validate_url_for_open, MAX_SEARCH_QUERY_LENGTH};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{self, ERR_NO_SERVER};
use super::Action;

/// Lines moved by page up/down in the detail panel.
const PAGE_LINES: usize = 20;

/// Maximum length of a node name typed into the create dialog.
const MAX_NAME_LENGTH: usize = 200;

/// Map the current view and focus to a keybinding context.
fn current_context(app: &App) -> KbContext {
    match (app.view, app.focus) {
        (View::Progress, _) => KbContext::Progress,
        (View::Tree, Focus::Tree) => KbContext::Tree,
        (View::Tree, Focus::Detail) => KbContext::Detail,
    }
}

/// Main input dispatch function.
///
/// Overlays capture every key while visible, in this order: help, delete
/// confirmation, dialogs, search prompt. Otherwise the key goes to the view.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    if app.show_help {
        return Ok(handle_help_input(app, code));
    }

    if app.pending_confirm.is_some() {
        return Ok(handle_confirm_input(app, code, event_tx));
    }

    if app.dialog.is_some() {
        return Ok(handle_dialog_input(app, code, modifiers, event_tx));
    }

    if app.search_mode {
        return Ok(handle_search_input(app, code, modifiers, event_tx));
    }

    match app.view {
        View::Tree => Ok(handle_tree_view_input(app, code, modifiers, event_tx)),
        View::Progress => Ok(handle_progress_input(app, code, modifiers, event_tx)),
    }
}

/// j/k/Up/Down scroll, Esc/q/? dismiss.
fn handle_help_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
    Action::Continue
}

/// y/Y confirms the delete, n/N/Esc cancels.
fn handle_confirm_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) -> Action {
    match code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            if let Some(ConfirmAction::Remove(pending)) = app.pending_confirm.take() {
                helpers::spawn_remove(app, pending, event_tx);
            }
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.pending_confirm = None;
            app.set_status("Cancelled");
        }
        _ => {}
    }
    Action::Continue
}

// ============================================================================
// Tree view
// ============================================================================

fn handle_tree_view_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let context = current_context(app);
    let Some(action) = app.keybindings.action_for_key(code, modifiers, context) else {
        return Action::Continue;
    };

    match action {
        KbAction::Quit => return Action::Quit,
        KbAction::Back => handle_back(app),
        KbAction::CycleFocus => {
            app.focus = match app.focus {
                Focus::Tree => Focus::Detail,
                Focus::Detail => Focus::Tree,
            };
        }
        KbAction::NavDown => app.nav_down(),
        KbAction::NavUp => app.nav_up(),
        KbAction::ScrollDown => app.scroll_down(1),
        KbAction::ScrollUp => app.scroll_up(1),
        KbAction::PageDown => app.scroll_down(PAGE_LINES),
        KbAction::PageUp => app.scroll_up(PAGE_LINES),
        KbAction::Select => handle_select(app, event_tx),
        KbAction::Expand => {
            if let Some(node) = app.cursor_node() {
                helpers::expand(app, node.id, event_tx);
            }
        }
        KbAction::Collapse => handle_collapse(app),
        KbAction::EnterSearch => {
            app.search_mode = true;
            app.search_input.clear();
            app.pending_search = None;
            app.search_debounce = None;
        }
        KbAction::Edit => begin_edit(app),
        KbAction::CreateChild => match app.cursor_node() {
            Some(node) => open_create(app, Some((node.id, node.name))),
            None => app.set_status("Select a parent topic first"),
        },
        KbAction::CreateRoot => open_create(app, None),
        KbAction::Delete => {
            if let Some(node) = app.cursor_node() {
                match app.model.request_remove(node.id) {
                    Ok(pending) => app.pending_confirm = Some(ConfirmAction::Remove(pending)),
                    Err(e) => app.set_status(e.summary()),
                }
            }
        }
        KbAction::MarkMove => {
            if let Some(node) = app.cursor_node() {
                app.move_mark = Some(node.id);
                app.set_status(format!("Marked {}. Go to the new parent and drop it there.", node.name));
            }
        }
        KbAction::DropMove => match (app.move_mark, app.cursor_node()) {
            (Some(id), Some(target)) => {
                app.move_mark = None;
                helpers::spawn_move(app, id, Some(target.id), None, event_tx);
            }
            (None, _) => app.set_status("Mark a node to move first"),
            (Some(_), None) => {}
        },
        KbAction::DropAsRoot => match app.move_mark.take() {
            Some(id) => helpers::spawn_move(app, id, None, None, event_tx),
            None => app.set_status("Mark a node to move first"),
        },
        KbAction::MoveUp => reorder(app, -1, event_tx),
        KbAction::MoveDown => reorder(app, 1, event_tx),
        KbAction::Populate => {
            if let Some(node) = app.current_node() {
                helpers::spawn_populate(app, node.id, event_tx);
            }
        }
        KbAction::Ask => {
            if app.learning.is_some() {
                app.dialog = Some(Dialog::Ask(AskState::Input {
                    input: String::new(),
                }));
            } else {
                app.set_status(ERR_NO_SERVER);
            }
        }
        KbAction::ViewProgress => {
            if app.learning.is_some() {
                app.view = View::Progress;
                helpers::spawn_history_load(app, event_tx);
            } else {
                app.set_status(ERR_NO_SERVER);
            }
        }
        KbAction::OpenReference => open_reference(app),
        KbAction::Reload => {
            if app.model.state().roots.is_empty() {
                app.set_status("Loading topics...");
                helpers::spawn_roots_load(app, event_tx);
            } else {
                helpers::spawn_resync(app, event_tx);
            }
        }
        KbAction::CycleTheme => {
            let name = app.cycle_theme();
            app.set_status(format!("Theme: {}", name));
        }
        KbAction::ShowHelp => {
            app.show_help = true;
            app.help_scroll_offset = 0;
        }
        KbAction::ExitSearch | KbAction::CommitSearch => {}
    }
    Action::Continue
}

/// Esc: drop a move mark first, then search highlights, then detail focus.
fn handle_back(app: &mut App) {
    if app.move_mark.take().is_some() {
        app.set_status("Move cancelled");
    } else if !app.model.state().search_results.is_empty() {
        app.abort_search();
        app.model.begin_search("");
        app.search_input.clear();
    } else if app.focus == Focus::Detail {
        app.focus = Focus::Tree;
    }
}

/// Enter on a row: collapse it if open, otherwise select and expand it.
fn handle_select(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(node) = app.cursor_node() else {
        return;
    };
    if app.model.state().is_expanded(node.id) {
        app.model.collapse(node.id);
        app.model.focus(node);
        app.sync_cursor();
    } else {
        app.scroll_offset = 0;
        helpers::select(app, node, event_tx);
    }
}

/// Collapse the row, or jump to its parent when it is already collapsed.
fn handle_collapse(app: &mut App) {
    let Some(node) = app.cursor_node() else {
        return;
    };
    if app.model.state().is_expanded(node.id) {
        app.model.collapse(node.id);
        return;
    }
    let parent = app
        .model
        .state()
        .find_cached(node.id)
        .and_then(|n| n.parent_id);
    if let Some(parent) = parent {
        if app.cursor_to(parent) {
            app.move_cursor(app.selected_row);
        }
    }
}

fn begin_edit(app: &mut App) {
    let Some(node) = app.current_node() else {
        return;
    };
    match app.model.begin_edit(node.id) {
        Ok(_) => {
            app.dialog = Some(Dialog::Edit {
                field: EditField::Name,
                saving: false,
            });
        }
        Err(e) => app.set_status(e.summary()),
    }
}

fn open_create(app: &mut App, parent: Option<(NodeId, String)>) {
    let (parent, parent_name) = match parent {
        Some((id, name)) => (Some(id), Some(name)),
        None => (None, None),
    };
    app.dialog = Some(Dialog::Create {
        parent,
        parent_name,
        input: String::new(),
    });
}

/// Shift the cursor node one place among its siblings.
fn reorder(app: &mut App, delta: isize, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(node) = app.cursor_node() else {
        return;
    };
    let Some((parent, index, len)) = app.model.sibling_position(node.id) else {
        return;
    };
    let Some(target) = index.checked_add_signed(delta).filter(|t| *t < len) else {
        return;
    };
    helpers::spawn_move(app, node.id, parent, Some(target), event_tx);
}

/// Open the first link found in the node's references, then its content.
fn open_reference(app: &mut App) {
    let Some(node) = app.current_node() else {
        return;
    };
    let link = [node.references.as_deref(), node.content.as_deref()]
        .into_iter()
        .flatten()
        .flat_map(extract_links)
        .next();
    let Some(link) = link else {
        app.set_status("No links in this topic");
        return;
    };
    if let Err(e) = validate_url_for_open(link.as_str()) {
        app.set_status(e.to_string());
    } else if let Err(e) = open::that(link.as_str()) {
        app.set_status(format!("Failed to open browser: {}", e));
    } else {
        app.set_status(format!("Opened {}", link));
    }
}

// ============================================================================
// Search prompt
// ============================================================================

fn handle_search_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    match app.keybindings.action_for_key(code, modifiers, KbContext::Search) {
        Some(KbAction::ExitSearch) => {
            app.search_mode = false;
            app.search_debounce = None;
            app.pending_search = None;
            app.search_input.clear();
            helpers::spawn_search(app, "", event_tx);
            return Action::Continue;
        }
        Some(KbAction::CommitSearch) => {
            // Cleared before searching so the tick handler cannot race us
            app.search_debounce = None;
            app.pending_search = None;
            app.search_mode = false;
            let query = app.search_input.clone();
            helpers::spawn_search(app, &query, event_tx);
            return Action::Continue;
        }
        _ => {}
    }

    match code {
        KeyCode::Backspace => {
            app.search_input.pop();
        }
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
            if app.search_input.chars().count() >= MAX_SEARCH_QUERY_LENGTH {
                app.set_status(format!(
                    "Search query at max length ({} chars)",
                    MAX_SEARCH_QUERY_LENGTH
                ));
                return Action::Continue;
            }
            app.search_input.push(c);
        }
        _ => return Action::Continue,
    }
    app.search_debounce = Some(tokio::time::Instant::now());
    app.pending_search = Some(app.search_input.clone());
    Action::Continue
}

// ============================================================================
// Progress view
// ============================================================================

fn handle_progress_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let count = match &app.progress {
        Some(ProgressState::Loaded(summaries)) => summaries.len(),
        _ => 0,
    };
    match app
        .keybindings
        .action_for_key(code, modifiers, KbContext::Progress)
    {
        Some(KbAction::Quit) => return Action::Quit,
        Some(KbAction::Back) => app.view = View::Tree,
        Some(KbAction::NavDown) => {
            if app.progress_selected + 1 < count {
                app.progress_selected += 1;
            }
        }
        Some(KbAction::NavUp) => app.progress_selected = app.progress_selected.saturating_sub(1),
        Some(KbAction::Reload) => helpers::spawn_history_load(app, event_tx),
        Some(KbAction::Select) => {
            let topic = match &app.progress {
                Some(ProgressState::Loaded(summaries)) => summaries
                    .get(app.progress_selected)
                    .map(|s| s.topic.clone()),
                _ => None,
            };
            if let Some(topic) = topic {
                app.view = View::Tree;
                app.focus = Focus::Tree;
                app.search_input = topic.clone();
                helpers::spawn_search(app, &topic, event_tx);
            }
        }
        Some(KbAction::CycleTheme) => {
            let name = app.cycle_theme();
            app.set_status(format!("Theme: {}", name));
        }
        Some(KbAction::ShowHelp) => app.show_help = true,
        _ => {}
    }
    Action::Continue
}

// ============================================================================
// Dialogs
// ============================================================================

fn handle_dialog_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    match app.dialog.take() {
        Some(Dialog::Edit { field, saving }) => {
            app.dialog = handle_edit_input(app, field, saving, code, modifiers, event_tx);
        }
        Some(Dialog::Create {
            parent,
            parent_name,
            mut input,
        }) => match code {
            KeyCode::Esc => app.set_status("Cancelled"),
            KeyCode::Enter => {
                let name = input.trim().to_string();
                if name.is_empty() {
                    app.set_status("Name cannot be empty");
                    app.dialog = Some(Dialog::Create {
                        parent,
                        parent_name,
                        input,
                    });
                } else {
                    helpers::spawn_create(app, name, parent, event_tx);
                }
            }
            other => {
                edit_line(&mut input, other, modifiers, MAX_NAME_LENGTH);
                app.dialog = Some(Dialog::Create {
                    parent,
                    parent_name,
                    input,
                });
            }
        },
        Some(Dialog::Ask(state)) => handle_ask_input(app, state, code, modifiers, event_tx),
        None => {}
    }
    Action::Continue
}

/// Returns the dialog state to keep, or `None` to close it.
fn handle_edit_input(
    app: &mut App,
    field: EditField,
    saving: bool,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Option<Dialog> {
    if saving {
        return Some(Dialog::Edit { field, saving });
    }
    let mut field = field;
    match code {
        KeyCode::Esc => {
            app.model.cancel_edit();
            app.set_status("Edit cancelled");
            return None;
        }
        KeyCode::Char('s') if modifiers.contains(KeyModifiers::CONTROL) => {
            let Some(draft) = app.model.draft() else {
                return None;
            };
            if draft.fields.name.trim().is_empty() {
                app.set_status("Name cannot be empty");
            } else if !draft.is_dirty() {
                app.model.cancel_edit();
                app.set_status("No changes");
                return None;
            } else {
                app.dialog = Some(Dialog::Edit { field, saving });
                helpers::spawn_save(app, event_tx);
                return app.dialog.take();
            }
        }
        KeyCode::Tab => field = field.next(),
        KeyCode::BackTab => field = field.prev(),
        KeyCode::Enter if !field.is_multiline() => field = field.next(),
        KeyCode::Enter => {
            if let Some(draft) = app.model.draft_mut() {
                field.value_mut(&mut draft.fields).push('\n');
            }
        }
        other => {
            if let Some(draft) = app.model.draft_mut() {
                edit_line(field.value_mut(&mut draft.fields), other, modifiers, usize::MAX);
            }
        }
    }
    Some(Dialog::Edit { field, saving })
}

fn handle_ask_input(
    app: &mut App,
    state: AskState,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match state {
        AskState::Input { mut input } => match code {
            KeyCode::Esc => {}
            KeyCode::Enter if !input.trim().is_empty() => {
                helpers::spawn_ask(app, input.trim().to_string(), event_tx);
            }
            other => {
                edit_line(&mut input, other, modifiers, MAX_SEARCH_QUERY_LENGTH * 4);
                app.dialog = Some(Dialog::Ask(AskState::Input { input }));
            }
        },
        // Closing while waiting drops the answer when it arrives
        AskState::Waiting { question } => {
            if code != KeyCode::Esc {
                app.dialog = Some(Dialog::Ask(AskState::Waiting { question }));
            }
        }
        AskState::Answered {
            question,
            answer,
            mut scroll,
        } => {
            match code {
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => return,
                KeyCode::Char('j') | KeyCode::Down => scroll = scroll.saturating_add(1),
                KeyCode::Char('k') | KeyCode::Up => scroll = scroll.saturating_sub(1),
                _ => {}
            }
            app.dialog = Some(Dialog::Ask(AskState::Answered {
                question,
                answer,
                scroll,
            }));
        }
    }
}

/// Apply a printable character or Backspace to a text buffer.
fn edit_line(buffer: &mut String, code: KeyCode, modifiers: KeyModifiers, max_chars: usize) {
    match code {
        KeyCode::Backspace => {
            buffer.pop();
        }
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
            if buffer.chars().count() < max_chars {
                buffer.push(c);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use crate::config::Config;
    use crate::tree::sync;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    async fn demo_app() -> App {
        let api = Arc::new(MemoryApi::demo());
        let mut app = App::new(api.clone(), None, &Config::default());
        app.model
            .apply_roots(sync::load_roots(api.as_ref()).await)
            .unwrap();
        app
    }

    fn press(app: &mut App, code: KeyCode, tx: &mpsc::Sender<AppEvent>) -> Action {
        handle_input(app, code, KeyModifiers::NONE, tx).unwrap()
    }

    fn status(app: &App) -> String {
        app.status_message
            .as_ref()
            .map(|(msg, _)| msg.to_string())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_quit() {
        let mut app = demo_app().await;
        let (tx, _rx) = mpsc::channel(8);
        assert!(matches!(press(&mut app, KeyCode::Char('q'), &tx), Action::Quit));
    }

    #[tokio::test]
    async fn test_help_captures_keys() {
        let mut app = demo_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('?'), &tx);
        assert!(app.show_help);

        // 'q' closes help instead of quitting
        assert!(matches!(press(&mut app, KeyCode::Char('q'), &tx), Action::Continue));
        assert!(!app.show_help);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let mut app = demo_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('d'), &tx);
        assert!(matches!(
            &app.pending_confirm,
            Some(ConfirmAction::Remove(p)) if p.node_id() == NodeId(1)
        ));

        press(&mut app, KeyCode::Char('n'), &tx);
        assert!(app.pending_confirm.is_none());
        assert_eq!(status(&app), "Cancelled");
        assert_eq!(app.rows().len(), 3);
    }

    #[tokio::test]
    async fn test_search_typing_sets_debounce() {
        let mut app = demo_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('/'), &tx);
        assert!(app.search_mode);

        press(&mut app, KeyCode::Char('n'), &tx);
        press(&mut app, KeyCode::Char('e'), &tx);
        press(&mut app, KeyCode::Backspace, &tx);
        assert_eq!(app.search_input, "n");
        assert_eq!(app.pending_search.as_deref(), Some("n"));
        assert!(app.search_debounce.is_some());

        press(&mut app, KeyCode::Esc, &tx);
        assert!(!app.search_mode);
        assert!(app.search_input.is_empty());
    }

    #[tokio::test]
    async fn test_search_enter_runs_immediately() {
        let mut app = demo_app().await;
        let (tx, mut rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('/'), &tx);
        for c in "algebra".chars() {
            press(&mut app, KeyCode::Char(c), &tx);
        }
        press(&mut app, KeyCode::Enter, &tx);
        assert!(!app.search_mode);
        assert!(app.search_debounce.is_none());
        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::SearchCompleted { ticket, .. }) if ticket.query == "algebra"
        ));
    }

    #[tokio::test]
    async fn test_move_without_mark() {
        let mut app = demo_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('v'), &tx);
        assert_eq!(status(&app), "Mark a node to move first");
    }

    #[tokio::test]
    async fn test_drop_on_itself_is_rejected() {
        let mut app = demo_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('m'), &tx);
        assert_eq!(app.move_mark, Some(NodeId(1)));

        press(&mut app, KeyCode::Char('v'), &tx);
        assert_eq!(status(&app), "A node cannot be moved beneath itself");
        assert!(app.move_mark.is_none());
    }

    #[tokio::test]
    async fn test_edit_dialog_flow() {
        let mut app = demo_app().await;
        let (tx, _rx) = mpsc::channel(8);
        app.move_cursor(1);
        press(&mut app, KeyCode::Char('e'), &tx);
        assert!(matches!(app.dialog, Some(Dialog::Edit { field: EditField::Name, .. })));

        press(&mut app, KeyCode::Char('!'), &tx);
        press(&mut app, KeyCode::Tab, &tx);
        press(&mut app, KeyCode::Char('x'), &tx);
        press(&mut app, KeyCode::Enter, &tx);
        let draft = app.model.draft().unwrap();
        assert_eq!(draft.fields.name, "Mathematics!");
        assert!(draft.fields.description.ends_with("x\n"));

        press(&mut app, KeyCode::Esc, &tx);
        assert!(app.dialog.is_none());
        assert!(app.model.draft().is_none());
        assert_eq!(app.model.find(NodeId(13)).map(|n| n.name.as_str()), Some("Mathematics"));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let mut app = demo_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('N'), &tx);
        press(&mut app, KeyCode::Char(' '), &tx);
        press(&mut app, KeyCode::Enter, &tx);
        assert_eq!(status(&app), "Name cannot be empty");
        assert!(matches!(app.dialog, Some(Dialog::Create { parent: None, .. })));
    }

    #[tokio::test]
    async fn test_learning_actions_need_server() {
        let mut app = demo_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Char('a'), &tx);
        assert!(app.dialog.is_none());
        assert_eq!(status(&app), ERR_NO_SERVER);

        press(&mut app, KeyCode::Char('P'), &tx);
        assert_eq!(app.view, View::Tree);
    }

    #[tokio::test]
    async fn test_cycle_focus_changes_context() {
        let mut app = demo_app().await;
        let (tx, _rx) = mpsc::channel(8);
        press(&mut app, KeyCode::Tab, &tx);
        assert_eq!(app.focus, Focus::Detail);
        assert_eq!(current_context(&app), KbContext::Detail);

        // j scrolls in the detail panel rather than moving the cursor
        press(&mut app, KeyCode::Char('j'), &tx);
        assert_eq!(app.selected_row, 0);
        assert_eq!(app.scroll_offset, 1);
    }
}
