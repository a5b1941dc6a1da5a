//! Application event handling.
//!
//! Applies background task completions to the tree model. Superseded
//! results come back as [`TreeError::Stale`] and are dropped quietly; every
//! other failure ends up in the status bar.

use crate::app::{App, AppEvent, AskState, Dialog, ProgressState};
use crate::progress::summarize;
use crate::tree::TreeError;
use tokio::sync::mpsc;

use super::helpers;

/// Apply one completion from a background task.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent, event_tx: &mpsc::Sender<AppEvent>) {
    match event {
        AppEvent::RootsLoaded(result) => match app.model.apply_roots(result) {
            Ok(()) => app.sync_cursor(),
            Err(e) => app.set_status(format!("Failed to load topics: {}", e.summary())),
        },
        AppEvent::ChildrenLoaded { fetch, result } => {
            match app.model.finish_children(fetch, result) {
                Ok(()) | Err(TreeError::Stale) => {}
                Err(e) => app.set_status(format!("Failed to load subtopics: {}", e.summary())),
            }
            app.sync_cursor();
        }
        AppEvent::SearchCompleted { ticket, result } => {
            let retry = app.model.search_needs_retry(&ticket);
            if retry || app.model.is_current_search(&ticket) {
                app.search_handle = None;
            }
            match app.model.apply_search(&ticket, result) {
                Ok(Some(_)) => {
                    app.scroll_offset = 0;
                    app.sync_cursor();
                    let count = app.model.state().search_results.len();
                    app.set_status(match count {
                        1 => format!("1 match for '{}'", ticket.query),
                        n => format!("{} matches for '{}'", n, ticket.query),
                    });
                }
                Ok(None) => app.set_status(format!("No matches for '{}'", ticket.query)),
                Err(TreeError::Stale) if retry => {
                    tracing::debug!(query = %ticket.query, "Tree rebuilt during search, searching again");
                    helpers::spawn_search(app, &ticket.query, event_tx);
                }
                Err(TreeError::Stale) => {}
                Err(e) => app.set_status(format!("Search failed: {}", e.summary())),
            }
        }
        AppEvent::Revealed { ticket, result } => {
            let retry = app.model.reveal_needs_retry(&ticket);
            if retry || app.model.is_current_reveal(&ticket) {
                app.search_handle = None;
            }
            match app.model.apply_reveal(&ticket, result) {
                Ok(_) => {
                    app.scroll_offset = 0;
                    app.sync_cursor();
                    app.status_message = None;
                }
                Err(TreeError::Stale) if retry => {
                    tracing::debug!(node_id = %ticket.node_id, "Tree rebuilt during restore, retrying");
                    helpers::spawn_restore(app, ticket.node_id, event_tx);
                }
                Err(TreeError::Stale) => {}
                Err(e) => app.set_status(format!("Could not open node: {}", e.summary())),
            }
        }
        AppEvent::Saved(result) => match app.model.apply_saved(result) {
            Ok(()) => {
                if matches!(app.dialog, Some(Dialog::Edit { .. })) {
                    app.dialog = None;
                }
                app.sync_cursor();
                app.set_status("Saved");
            }
            Err(e) => {
                if let Some(Dialog::Edit { saving, .. }) = &mut app.dialog {
                    *saving = false;
                }
                app.set_status(format!("Save failed: {}", e.summary()));
            }
        },
        AppEvent::Resynced { action, result } => match app.model.apply_resync(result) {
            Ok(()) => {
                app.sync_cursor();
                app.set_status(action);
            }
            Err(e) => app.set_status(format!("{} failed: {}", action_verb(action), e.summary())),
        },
        AppEvent::Created(result) => {
            let name = result.as_ref().ok().map(|(node, _)| node.name.clone());
            match app.model.apply_created(result) {
                Ok(fetches) => {
                    helpers::spawn_child_fetches(app, fetches, event_tx);
                    app.scroll_offset = 0;
                    app.sync_cursor();
                    app.set_status(format!("Created {}", name.unwrap_or_default()));
                }
                Err(e) => app.set_status(format!("Create failed: {}", e.summary())),
            }
        }
        AppEvent::Removed { pending, result } => {
            let name = pending.name().to_string();
            match app.model.apply_removed(pending, result) {
                Ok(()) => {
                    app.abort_search();
                    app.abort_populate();
                    app.move_mark = None;
                    app.selected_row = 0;
                    app.scroll_offset = 0;
                    helpers::spawn_roots_load(app, event_tx);
                    app.set_status(format!("Deleted {}", name));
                }
                Err(e) => app.set_status(format!("Delete failed: {}", e.summary())),
            }
        }
        AppEvent::Populated { ticket, result } => {
            // A superseded ticket belongs to an aborted request
            let current = app.model.populating() == Some(ticket);
            let name = app
                .model
                .find(ticket.node_id)
                .map_or_else(|| ticket.node_id.to_string(), |n| n.name.clone());
            match app.model.apply_populate(ticket, result) {
                Ok(()) => {
                    app.populate_handle = None;
                    app.sync_cursor();
                    app.set_status(format!("Generated topics for {}", name));
                }
                Err(TreeError::Stale) if current => {
                    app.populate_handle = None;
                    app.set_status(format!("Topics generated for {}; reload to see them", name));
                }
                Err(TreeError::Stale) => {}
                Err(e) => {
                    app.populate_handle = None;
                    app.set_status(format!("Generating topics failed: {}", e.summary()));
                }
            }
        }
        AppEvent::AskAnswered { question, result } => {
            let waiting = matches!(
                &app.dialog,
                Some(Dialog::Ask(AskState::Waiting { question: q })) if *q == question
            );
            if !waiting {
                tracing::debug!("Ask dialog closed before the answer arrived");
                return;
            }
            match result {
                Ok(answer) => {
                    app.dialog = Some(Dialog::Ask(AskState::Answered {
                        question,
                        answer,
                        scroll: 0,
                    }));
                }
                Err(e) => {
                    app.dialog = Some(Dialog::Ask(AskState::Input { input: question }));
                    app.set_status(format!("Ask failed: {}", e.summary()));
                }
            }
        }
        AppEvent::HistoryLoaded(result) => {
            app.progress = Some(match result {
                Ok(history) => {
                    let summaries = summarize(&history);
                    app.progress_selected = app
                        .progress_selected
                        .min(summaries.len().saturating_sub(1));
                    ProgressState::Loaded(summaries)
                }
                Err(e) => ProgressState::Failed(e.summary()),
            });
        }
        AppEvent::TaskPanicked { task, error } => {
            app.set_status(format!("Internal error in {}: {}", task, error));
        }
    }
}

/// Present-tense verb for a past-tense status label.
fn action_verb(action: &str) -> &str {
    match action {
        "Moved" => "Move",
        "Reloaded" => "Reload",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MemoryApi, NodeId};
    use crate::config::Config;
    use crate::tree::sync;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    async fn loaded_app() -> (App, Arc<MemoryApi>) {
        let api = Arc::new(MemoryApi::demo());
        let mut app = App::new(api.clone(), None, &Config::default());
        let (tx, _rx) = mpsc::channel(8);
        let roots = sync::load_roots(api.as_ref()).await;
        handle_app_event(&mut app, AppEvent::RootsLoaded(roots), &tx);
        (app, api)
    }

    fn status(app: &App) -> String {
        app.status_message
            .as_ref()
            .map(|(msg, _)| msg.to_string())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_roots_loaded_populates_rows() {
        let (app, _) = loaded_app().await;
        let names: Vec<String> = app.rows().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Computer Science", "Mathematics", "Physical Fitness"]);
    }

    #[tokio::test]
    async fn test_roots_load_failure_reported() {
        let api = Arc::new(MemoryApi::demo());
        let mut app = App::new(api, None, &Config::default());
        let (tx, _rx) = mpsc::channel(8);
        handle_app_event(&mut app, AppEvent::RootsLoaded(Err(ApiError::Timeout)), &tx);
        assert_eq!(status(&app), "Failed to load topics: timed out");
        assert!(app.rows().is_empty());
    }

    #[tokio::test]
    async fn test_children_loaded_expands_row() {
        let (mut app, api) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(8);
        let fetch = match app.model.begin_expand(NodeId(1)) {
            crate::tree::ExpandStep::Fetch(fetch) => fetch,
            other => panic!("expected fetch, got {:?}", other),
        };
        let result = sync::fetch_children(api.as_ref(), NodeId(1)).await;
        handle_app_event(&mut app, AppEvent::ChildrenLoaded { fetch, result }, &tx);
        assert!(app.rows().len() > 3);
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_stale_search_is_silent() {
        let (mut app, api) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(8);
        let old = app.model.begin_search("network").unwrap();
        let _new = app.model.begin_search("algebra");

        let snapshot = app.model.state().snapshot();
        let result = sync::run_search(api.as_ref(), &snapshot, "network").await;
        handle_app_event(&mut app, AppEvent::SearchCompleted { ticket: old, result }, &tx);
        assert!(app.status_message.is_none());
        assert!(app.model.state().search_results.is_empty());
    }

    #[tokio::test]
    async fn test_search_interrupted_by_reload_runs_again() {
        let (mut app, api) = loaded_app().await;
        let (tx, mut rx) = mpsc::channel(8);
        let ticket = app.model.begin_search("network").unwrap();
        let snapshot = app.model.state().snapshot();
        let result = sync::run_search(api.as_ref(), &snapshot, "network").await;

        let plan = app.model.resync_plan();
        let resync = sync::resync(api.as_ref(), &plan).await;
        handle_app_event(&mut app, AppEvent::Resynced { action: "Reloaded", result: resync }, &tx);
        handle_app_event(&mut app, AppEvent::SearchCompleted { ticket, result }, &tx);
        assert!(app.model.state().search_results.is_empty());
        assert_eq!(status(&app), "Searching for 'network'...");

        let Some(event @ AppEvent::SearchCompleted { .. }) = rx.recv().await else {
            panic!("expected the search to run again");
        };
        handle_app_event(&mut app, event, &tx);
        assert_eq!(status(&app), "1 match for 'network'");
        assert_eq!(app.model.state().selected_id(), Some(NodeId(4)));
    }

    #[tokio::test]
    async fn test_removed_clears_and_reloads() {
        let (mut app, api) = loaded_app().await;
        let (tx, mut rx) = mpsc::channel(8);
        app.move_mark = Some(NodeId(13));
        let pending = app.model.request_remove(NodeId(16)).unwrap();
        let result = sync::remove(api.as_ref(), &pending).await;

        handle_app_event(&mut app, AppEvent::Removed { pending, result }, &tx);
        assert_eq!(status(&app), "Deleted Physical Fitness");
        assert!(app.move_mark.is_none());
        assert!(app.rows().is_empty());

        let Some(AppEvent::RootsLoaded(roots)) = rx.recv().await else {
            panic!("expected a roots reload");
        };
        assert_eq!(roots.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ask_answer_ignored_after_dialog_closed() {
        let (mut app, _) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(8);
        handle_app_event(
            &mut app,
            AppEvent::AskAnswered {
                question: "What is a monad?".into(),
                result: Ok("A monoid in the category of endofunctors".into()),
            },
            &tx,
        );
        assert!(app.dialog.is_none());
    }

    #[tokio::test]
    async fn test_ask_answer_fills_dialog() {
        let (mut app, _) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(8);
        app.dialog = Some(Dialog::Ask(AskState::Waiting {
            question: "Why Rust?".into(),
        }));
        handle_app_event(
            &mut app,
            AppEvent::AskAnswered {
                question: "Why Rust?".into(),
                result: Ok("Memory safety".into()),
            },
            &tx,
        );
        assert!(matches!(
            &app.dialog,
            Some(Dialog::Ask(AskState::Answered { answer, .. })) if answer == "Memory safety"
        ));
    }

    #[tokio::test]
    async fn test_task_panic_reported() {
        let (mut app, _) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(8);
        handle_app_event(
            &mut app,
            AppEvent::TaskPanicked {
                task: "search",
                error: "boom".into(),
            },
            &tx,
        );
        assert_eq!(status(&app), "Internal error in search: boom");
    }
}
