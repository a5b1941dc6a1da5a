//! Helper functions for UI operations.
//!
//! Every network operation runs in a spawned task that sends one
//! [`AppEvent`] back to the loop. The tree model is never touched from a
//! task; tasks only see cloned inputs (snapshots, plans, drafts).

use crate::app::{App, AppEvent, AskState, Dialog, ProgressState};
use crate::tree::{sync, ChildFetch, ExpandStep, PendingRemoval, TreeError};
use crate::api::{Node, NodeId};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shown when a learning endpoint is used without a server.
pub(super) const ERR_NO_SERVER: &str = "Not available in demo mode";

/// Wraps a future to catch panics and convert them to errors.
///
/// Instead of a task silently disappearing, its panic message comes back as
/// `Err(String)` so the loop can report it.
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else if let Some(e) = panic.downcast_ref::<Box<dyn std::error::Error + Send>>() {
                e.to_string()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Spawn `work` and send the event it produces. A panic is reported as
/// [`AppEvent::TaskPanicked`] instead.
fn spawn_task<F>(task: &'static str, tx: &mpsc::Sender<AppEvent>, work: F) -> JoinHandle<()>
where
    F: Future<Output = AppEvent> + Send + 'static,
{
    let tx = tx.clone();
    tokio::spawn(async move {
        match catch_task_panic(work).await {
            Ok(event) => {
                if let Err(e) = tx.send(event).await {
                    tracing::warn!(error = %e, event = task, "Channel send failed (receiver dropped)");
                }
            }
            Err(panic_msg) => {
                tracing::error!(task, error = %panic_msg, "Background task panicked");
                let _ = tx
                    .send(AppEvent::TaskPanicked {
                        task,
                        error: panic_msg,
                    })
                    .await;
            }
        }
    })
}

// ============================================================================
// Tree loading
// ============================================================================

/// Load the root nodes in the background.
pub fn spawn_roots_load(app: &App, tx: &mpsc::Sender<AppEvent>) {
    let api = app.api.clone();
    spawn_task("load_roots", tx, async move {
        AppEvent::RootsLoaded(sync::load_roots(api.as_ref()).await)
    });
}

pub(super) fn spawn_child_fetches(app: &App, fetches: Vec<ChildFetch>, tx: &mpsc::Sender<AppEvent>) {
    for fetch in fetches {
        let api = app.api.clone();
        tracing::debug!(parent = %fetch.parent, "Spawning child fetch");
        spawn_task("fetch_children", tx, async move {
            let result = sync::fetch_children(api.as_ref(), fetch.parent).await;
            AppEvent::ChildrenLoaded { fetch, result }
        });
    }
}

/// Expand `id`, fetching its children when needed.
pub(super) fn expand(app: &mut App, id: NodeId, tx: &mpsc::Sender<AppEvent>) {
    if let ExpandStep::Fetch(fetch) = app.model.begin_expand(id) {
        spawn_child_fetches(app, vec![fetch], tx);
    }
}

/// Select `node` through the model and load what its expansion needs.
pub(super) fn select(app: &mut App, node: Node, tx: &mpsc::Sender<AppEvent>) {
    let fetches = app.model.select(node);
    spawn_child_fetches(app, fetches, tx);
    app.sync_cursor();
}

// ============================================================================
// Search and reveal
// ============================================================================

/// Start a search for `query`, superseding any running search or reveal.
pub fn spawn_search(app: &mut App, query: &str, tx: &mpsc::Sender<AppEvent>) {
    app.abort_search();
    let Some(ticket) = app.model.begin_search(query) else {
        tracing::debug!("Empty query, cleared search results");
        return;
    };

    app.set_status(format!("Searching for '{}'...", ticket.query));
    tracing::debug!(query = %ticket.query, "Spawning search task");

    let api = app.api.clone();
    let snapshot = app.model.state().snapshot();
    app.search_handle = Some(spawn_task("search", tx, async move {
        let result = sync::run_search(api.as_ref(), &snapshot, &ticket.query).await;
        AppEvent::SearchCompleted { ticket, result }
    }));
}

/// Reveal and select a node known only by id.
pub fn spawn_restore(app: &mut App, id: NodeId, tx: &mpsc::Sender<AppEvent>) {
    app.abort_search();
    let ticket = app.model.begin_restore(id);
    app.set_status(format!("Opening node {}...", id));

    let api = app.api.clone();
    let snapshot = app.model.state().snapshot();
    app.search_handle = Some(spawn_task("restore", tx, async move {
        let result = sync::restore(api.as_ref(), &snapshot, id).await;
        AppEvent::Revealed { ticket, result }
    }));
}

// ============================================================================
// Edits
// ============================================================================

pub(super) fn spawn_save(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let Some(draft) = app.model.draft().cloned() else {
        return;
    };
    if let Some(Dialog::Edit { saving, .. }) = &mut app.dialog {
        *saving = true;
    }
    app.set_status(format!("Saving {}...", draft.fields.name.trim()));

    let api = app.api.clone();
    spawn_task("save", tx, async move {
        AppEvent::Saved(sync::save(api.as_ref(), &draft).await)
    });
}

/// Move `id` beneath `new_parent` (`None` = root) at `index` among its new
/// siblings (last when `None`).
pub(super) fn spawn_move(
    app: &mut App,
    id: NodeId,
    new_parent: Option<NodeId>,
    index: Option<usize>,
    tx: &mpsc::Sender<AppEvent>,
) {
    let node = match app.model.prepare_move(id, new_parent) {
        Ok(node) => node,
        Err(e) => {
            tracing::debug!(node_id = %id, error = %e, "Move rejected");
            app.set_status(e.summary());
            return;
        }
    };
    let index = index.unwrap_or_else(|| {
        let state = app.model.state();
        match new_parent {
            Some(parent) => state.children_of(parent).map_or_else(
                || app.model.find(parent).and_then(|p| p.child_ids.as_ref()).map_or(0, Vec::len),
                <[Node]>::len,
            ),
            None => state.roots.len(),
        }
    });
    let order = i32::try_from(index).unwrap_or(i32::MAX);
    let plan = app.model.resync_plan();

    app.set_status(format!("Moving {}...", node.name));
    tracing::info!(node_id = %id, new_parent = ?new_parent, order, "Moving node");

    let api = app.api.clone();
    spawn_task("move", tx, async move {
        let result = sync::move_node(api.as_ref(), &node, new_parent, order, &plan).await;
        AppEvent::Resynced {
            action: "Moved",
            result,
        }
    });
}

/// Re-fetch everything visible.
pub(super) fn spawn_resync(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    app.set_status("Reloading...");
    let plan = app.model.resync_plan();
    let api = app.api.clone();
    spawn_task("reload", tx, async move {
        AppEvent::Resynced {
            action: "Reloaded",
            result: sync::resync(api.as_ref(), &plan).await,
        }
    });
}

pub(super) fn spawn_create(
    app: &mut App,
    name: String,
    parent: Option<NodeId>,
    tx: &mpsc::Sender<AppEvent>,
) {
    app.set_status(format!("Creating {}...", name));
    let plan = app.model.create_plan(parent);
    let api = app.api.clone();
    spawn_task("create", tx, async move {
        AppEvent::Created(sync::create(api.as_ref(), &name, parent, &plan).await)
    });
}

pub(super) fn spawn_remove(app: &mut App, pending: PendingRemoval, tx: &mpsc::Sender<AppEvent>) {
    app.set_status(format!("Deleting {}...", pending.name()));
    let api = app.api.clone();
    spawn_task("remove", tx, async move {
        let result = sync::remove(api.as_ref(), &pending).await;
        AppEvent::Removed { pending, result }
    });
}

/// Generate child topics for `id`. A running request for another node is
/// cancelled; one for the same node refuses the new request.
pub(super) fn spawn_populate(app: &mut App, id: NodeId, tx: &mpsc::Sender<AppEvent>) {
    let Some(node) = app.model.find(id).cloned() else {
        app.set_status(TreeError::NotFound(id).summary());
        return;
    };
    let ticket = match app.model.begin_populate(id) {
        Ok(ticket) => ticket,
        Err(e) => {
            app.set_status(e.summary());
            return;
        }
    };
    app.abort_populate();
    app.set_status(format!("Generating topics for {}...", node.name));

    let api = app.api.clone();
    app.populate_handle = Some(spawn_task("populate", tx, async move {
        let result = sync::populate(api.as_ref(), &node).await;
        AppEvent::Populated { ticket, result }
    }));
}

// ============================================================================
// Learning endpoints
// ============================================================================

pub(super) fn spawn_ask(app: &mut App, question: String, tx: &mpsc::Sender<AppEvent>) {
    let Some(client) = app.learning.clone() else {
        app.dialog = None;
        app.set_status(ERR_NO_SERVER);
        return;
    };
    app.dialog = Some(Dialog::Ask(AskState::Waiting {
        question: question.clone(),
    }));
    spawn_task("ask", tx, async move {
        let result = client.ask(&question).await;
        AppEvent::AskAnswered { question, result }
    });
}

pub(super) fn spawn_history_load(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let Some(client) = app.learning.clone() else {
        app.set_status(ERR_NO_SERVER);
        return;
    };
    app.progress = Some(ProgressState::Loading);
    spawn_task("history", tx, async move {
        AppEvent::HistoryLoaded(client.history().await)
    });
}
