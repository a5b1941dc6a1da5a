//! Async halves of the tree operations.
//!
//! Each function only talks to the [`TreeApi`] and returns plain data; the
//! [`TreeModel`](super::TreeModel) decides whether and how that data lands in
//! state. Nothing here holds a lock on the model, so these run inside spawned
//! tasks.

use super::model::{NodeDraft, PendingRemoval, ResyncPlan};
use super::state::CacheSnapshot;
use crate::api::{ApiError, NewNode, Node, NodeId, NodeUpdate, TreeApi};
use futures::future::{join_all, try_join, try_join_all};
use std::collections::HashSet;

/// Everything needed to show a node deep in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reveal {
    pub target: Node,
    /// Ancestors in root-to-leaf order. May start below a root when a parent
    /// could not be resolved.
    pub ancestors: Vec<Node>,
    /// Fresh roots, when none were loaded.
    pub roots: Option<Vec<Node>>,
    /// Children fetched for ancestors that had none cached.
    pub children: Vec<(NodeId, Vec<Node>)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub results: Vec<Node>,
    /// Reveal of the primary (first) match.
    pub reveal: Option<Reveal>,
}

/// Fresh copy of every visible branch after a structural edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resync {
    pub roots: Vec<Node>,
    /// Branches that loaded. Failed ones are left out and collapse.
    pub branches: Vec<(NodeId, Vec<Node>)>,
    /// Server copy of the previously selected node, if it still exists.
    pub selected: Option<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateRefresh {
    pub roots: Vec<Node>,
    pub node: Node,
    pub children: Vec<Node>,
}

// ============================================================================
// Loading
// ============================================================================

pub async fn load_roots<A: TreeApi + ?Sized>(api: &A) -> Result<Vec<Node>, ApiError> {
    api.roots().await
}

pub async fn fetch_children<A: TreeApi + ?Sized>(
    api: &A,
    parent: NodeId,
) -> Result<Vec<Node>, ApiError> {
    api.children(parent).await
}

/// Resolve the ancestor chain of `target` and fetch every missing piece
/// needed to display it.
///
/// Parents are taken from the cache first and fetched by id otherwise. A
/// parent the server no longer has ends the chain there. Uncached child
/// lists (and the roots, if none are loaded) are fetched concurrently.
pub async fn reveal<A: TreeApi + ?Sized>(
    api: &A,
    snapshot: &CacheSnapshot,
    target: Node,
) -> Result<Reveal, ApiError> {
    let mut ancestors = Vec::new();
    let mut seen = HashSet::from([target.id]);
    let mut next = target.parent_id;

    while let Some(parent_id) = next {
        if !seen.insert(parent_id) {
            tracing::warn!(node_id = %target.id, parent_id = %parent_id, "Cycle in parent chain");
            break;
        }
        let parent = match snapshot.get(parent_id) {
            Some(cached) => cached.clone(),
            None => match api.node(parent_id).await {
                Ok(node) => node,
                Err(e) if e.is_not_found() => {
                    tracing::debug!(parent_id = %parent_id, "Ancestor no longer exists");
                    break;
                }
                Err(e) => return Err(e),
            },
        };
        next = parent.parent_id;
        ancestors.push(parent);
    }
    ancestors.reverse();

    let missing: Vec<NodeId> = ancestors
        .iter()
        .map(|a| a.id)
        .filter(|id| !snapshot.has_children_cached(*id))
        .collect();

    let branches = try_join_all(missing.into_iter().map(|id| async move {
        api.children(id).await.map(|children| (id, children))
    }));
    let roots = async {
        if snapshot.roots_loaded {
            Ok(None)
        } else {
            api.roots().await.map(Some)
        }
    };
    let (children, roots) = try_join(branches, roots).await?;

    Ok(Reveal {
        target,
        ancestors,
        roots,
        children,
    })
}

/// Search, then reveal the first match.
pub async fn run_search<A: TreeApi + ?Sized>(
    api: &A,
    snapshot: &CacheSnapshot,
    query: &str,
) -> Result<SearchOutcome, ApiError> {
    let results = api.search(query).await?;
    let reveal = match results.first() {
        Some(first) => Some(reveal(api, snapshot, first.clone()).await?),
        None => None,
    };
    Ok(SearchOutcome { results, reveal })
}

/// Reveal a node known only by id.
pub async fn restore<A: TreeApi + ?Sized>(
    api: &A,
    snapshot: &CacheSnapshot,
    id: NodeId,
) -> Result<Reveal, ApiError> {
    let target = match snapshot.get(id) {
        Some(cached) => cached.clone(),
        None => api.node(id).await?,
    };
    reveal(api, snapshot, target).await
}

// ============================================================================
// Structural edits
// ============================================================================

/// Re-fetch the roots, every expanded branch and the selected node, all at
/// once.
///
/// Only a failed roots fetch fails the resync.
pub async fn resync<A: TreeApi + ?Sized>(api: &A, plan: &ResyncPlan) -> Result<Resync, ApiError> {
    let branches = join_all(plan.expanded.iter().map(|&id| async move {
        match api.children(id).await {
            Ok(children) => Some((id, children)),
            Err(e) => {
                tracing::debug!(parent = %id, error = %e, "Dropping branch from resync");
                None
            }
        }
    }));
    let selected = async {
        match plan.selected {
            Some(id) => match api.node(id).await {
                Ok(node) => Some(node),
                Err(e) => {
                    if !e.is_not_found() {
                        tracing::warn!(node_id = %id, error = %e, "Could not refresh selection");
                    }
                    None
                }
            },
            None => None,
        }
    };

    let (roots, branches, selected) = futures::join!(api.roots(), branches, selected);
    Ok(Resync {
        roots: roots?,
        branches: branches.into_iter().flatten().collect(),
        selected,
    })
}

pub async fn save<A: TreeApi + ?Sized>(api: &A, draft: &NodeDraft) -> Result<Node, ApiError> {
    let update = NodeUpdate::from_fields(&draft.original, &draft.fields);
    api.update(draft.node_id, &update).await
}

/// Re-parent `node` (or reorder it among its siblings), then resync.
pub async fn move_node<A: TreeApi + ?Sized>(
    api: &A,
    node: &Node,
    new_parent: Option<NodeId>,
    order: i32,
    plan: &ResyncPlan,
) -> Result<Resync, ApiError> {
    api.update(node.id, &NodeUpdate::relocate(node, new_parent, order))
        .await?;
    resync(api, plan).await
}

pub async fn remove<A: TreeApi + ?Sized>(api: &A, pending: &PendingRemoval) -> Result<(), ApiError> {
    api.delete(pending.node_id()).await
}

/// Create a node, then resync with its parent's branch included.
pub async fn create<A: TreeApi + ?Sized>(
    api: &A,
    name: &str,
    parent: Option<NodeId>,
    plan: &ResyncPlan,
) -> Result<(Node, Resync), ApiError> {
    let created = api.create(&NewNode::new(name.trim(), parent)).await?;
    let resync = resync(api, plan).await?;
    Ok((created, resync))
}

/// Generate children for `node`, then fetch the refreshed roots, node and
/// children.
pub async fn populate<A: TreeApi + ?Sized>(api: &A, node: &Node) -> Result<PopulateRefresh, ApiError> {
    api.populate(node).await?;
    let (roots, (fresh, children)) = try_join(
        api.roots(),
        try_join(api.node(node.id), api.children(node.id)),
    )
    .await?;
    Ok(PopulateRefresh {
        roots,
        node: fresh,
        children,
    })
}
