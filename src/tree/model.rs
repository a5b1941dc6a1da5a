use super::state::TreeState;
use super::sync::{PopulateRefresh, Resync, Reveal, SearchOutcome};
use super::TreeError;
use crate::api::{ApiError, Node, NodeFields, NodeId};
use crate::util::single_line;
use std::collections::HashSet;

// ============================================================================
// Tickets
// ============================================================================

/// Permission to fetch the children of `parent`.
///
/// Tickets from before a wholesale cache invalidation are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildFetch {
    pub parent: NodeId,
    epoch: u64,
}

/// Outcome of asking to expand a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandStep {
    AlreadyExpanded,
    /// Children were cached; the node is now expanded.
    Cached,
    /// A fetch for this node is already running.
    InFlight,
    /// The node is expanded and its children must be fetched.
    Fetch(ChildFetch),
}

/// A running search. Superseded by the next search or restore, and by any
/// wholesale cache invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    generation: u64,
    epoch: u64,
    pub query: String,
}

/// A running deep-link restore. Shares the search generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTicket {
    generation: u64,
    epoch: u64,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulateTicket {
    generation: u64,
    epoch: u64,
    pub node_id: NodeId,
}

/// Confirmation token for a delete. Only [`TreeModel::request_remove`] makes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRemoval {
    node_id: NodeId,
    name: String,
}

impl PendingRemoval {
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// In-progress edit of a node, kept apart from the cached copy until saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDraft {
    pub node_id: NodeId,
    pub original: Node,
    pub fields: NodeFields,
}

impl NodeDraft {
    pub fn is_dirty(&self) -> bool {
        self.fields != self.original.fields()
    }
}

/// One line of the flattened, visible tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: NodeId,
    pub name: String,
    /// Nesting depth (0 = root).
    pub depth: usize,
    pub has_children: bool,
    pub is_expanded: bool,
    /// Children are being fetched.
    pub is_loading: bool,
    /// Name of the root this row descends from, for category colors.
    pub root_name: String,
}

// ============================================================================
// TreeModel
// ============================================================================

/// Owner of [`TreeState`]. Every mutation goes through here.
///
/// Network work is split in two: a `begin_*` call records intent and returns a
/// ticket, and the matching `apply_*` call checks that ticket before applying
/// a result. A result whose ticket was superseded yields [`TreeError::Stale`]
/// and leaves state untouched.
#[derive(Debug, Default)]
pub struct TreeModel {
    state: TreeState,
    /// Parents whose children are being fetched.
    in_flight: HashSet<NodeId>,
    /// Bumped on wholesale invalidation.
    epoch: u64,
    search_generation: u64,
    populate_generation: u64,
    populating: Option<PopulateTicket>,
    draft: Option<NodeDraft>,
}

impl TreeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TreeState {
        &self.state
    }

    pub fn selected(&self) -> Option<&Node> {
        self.state.selected.as_ref()
    }

    pub fn is_loading(&self, id: NodeId) -> bool {
        self.in_flight.contains(&id)
    }

    /// Find a node in the cache, the selection or the search results.
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.state
            .find_cached(id)
            .or_else(|| self.state.selected.as_ref().filter(|n| n.id == id))
            .or_else(|| self.state.search_results.iter().find(|n| n.id == id))
    }

    /// Breadcrumbs of the selected node, root first.
    pub fn breadcrumbs(&self) -> Vec<Node> {
        match &self.state.selected {
            Some(node) => self.state.breadcrumbs(node),
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Roots
    // ------------------------------------------------------------------------

    pub fn apply_roots(&mut self, result: Result<Vec<Node>, ApiError>) -> Result<(), TreeError> {
        let roots = result?;
        tracing::debug!(count = roots.len(), "Loaded roots");
        self.state.roots = roots;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Expand / collapse / select
    // ------------------------------------------------------------------------

    /// Expand `id`, fetching its children only if they are neither cached nor
    /// already being fetched.
    pub fn begin_expand(&mut self, id: NodeId) -> ExpandStep {
        if self.state.children.contains_key(&id) {
            if self.state.expanded.insert(id) {
                ExpandStep::Cached
            } else {
                ExpandStep::AlreadyExpanded
            }
        } else if self.in_flight.contains(&id) {
            self.state.expanded.insert(id);
            ExpandStep::InFlight
        } else {
            self.in_flight.insert(id);
            self.state.expanded.insert(id);
            ExpandStep::Fetch(ChildFetch {
                parent: id,
                epoch: self.epoch,
            })
        }
    }

    /// Apply a finished child fetch.
    ///
    /// On failure the node collapses again and any earlier cache entry is
    /// left as it was.
    pub fn finish_children(
        &mut self,
        fetch: ChildFetch,
        result: Result<Vec<Node>, ApiError>,
    ) -> Result<(), TreeError> {
        if fetch.epoch != self.epoch {
            tracing::debug!(parent = %fetch.parent, "Discarding child fetch from before invalidation");
            return Err(TreeError::Stale);
        }
        self.in_flight.remove(&fetch.parent);

        match result {
            Ok(children) => {
                tracing::debug!(parent = %fetch.parent, count = children.len(), "Cached children");
                self.state.cache_children(fetch.parent, children);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(parent = %fetch.parent, error = %e, "Failed to fetch children");
                if !self.state.children.contains_key(&fetch.parent) {
                    self.state.expanded.remove(&fetch.parent);
                }
                Err(TreeError::Fetch(e))
            }
        }
    }

    /// Hide children of `id`; the cache keeps them.
    pub fn collapse(&mut self, id: NodeId) {
        self.state.expanded.remove(&id);
    }

    /// Point the selection at `node` without fetching or expanding anything.
    pub fn focus(&mut self, node: Node) {
        self.state.selected = Some(node);
    }

    /// Select `node`, expand its cached ancestor chain, and expand the node
    /// itself if it has children.
    ///
    /// Returns the child fetches needed to honour the expansions.
    pub fn select(&mut self, node: Node) -> Vec<ChildFetch> {
        let mut fetches = Vec::new();
        let ancestors: Vec<NodeId> = self
            .state
            .ancestor_path(&node)
            .iter()
            .map(|n| n.id)
            .collect();
        for id in ancestors {
            if let ExpandStep::Fetch(fetch) = self.begin_expand(id) {
                fetches.push(fetch);
            }
        }

        let has_cached_children = self
            .state
            .children_of(node.id)
            .is_some_and(|c| !c.is_empty());
        if node.has_children() || has_cached_children {
            if let ExpandStep::Fetch(fetch) = self.begin_expand(node.id) {
                fetches.push(fetch);
            }
        }

        tracing::debug!(node_id = %node.id, fetches = fetches.len(), "Selected node");
        self.state.selected = Some(node);
        fetches
    }

    // ------------------------------------------------------------------------
    // Search and reveal
    // ------------------------------------------------------------------------

    /// Start a search. An empty query clears the results (keeping the
    /// selection) and returns `None`.
    ///
    /// Either way, any search still running is superseded.
    pub fn begin_search(&mut self, query: &str) -> Option<SearchTicket> {
        self.search_generation += 1;
        let query = query.trim();
        if query.is_empty() {
            self.state.search_results.clear();
            return None;
        }
        Some(SearchTicket {
            generation: self.search_generation,
            epoch: self.epoch,
            query: query.to_string(),
        })
    }

    /// Start revealing `id`, superseding any running search or restore.
    pub fn begin_restore(&mut self, id: NodeId) -> RevealTicket {
        self.search_generation += 1;
        RevealTicket {
            generation: self.search_generation,
            epoch: self.epoch,
            node_id: id,
        }
    }

    pub fn is_current_search(&self, ticket: &SearchTicket) -> bool {
        ticket.generation == self.search_generation && ticket.epoch == self.epoch
    }

    pub fn is_current_reveal(&self, ticket: &RevealTicket) -> bool {
        ticket.generation == self.search_generation && ticket.epoch == self.epoch
    }

    /// The search lost only to a cache invalidation and nothing newer has
    /// started since, so it is worth running again.
    pub fn search_needs_retry(&self, ticket: &SearchTicket) -> bool {
        self.lost_to_invalidation(ticket.generation, ticket.epoch)
    }

    pub fn reveal_needs_retry(&self, ticket: &RevealTicket) -> bool {
        self.lost_to_invalidation(ticket.generation, ticket.epoch)
    }

    fn lost_to_invalidation(&self, generation: u64, epoch: u64) -> bool {
        generation == self.search_generation && epoch != self.epoch
    }

    /// Apply a finished search: results, then the reveal of the primary match
    /// in one step. Returns the id of the revealed node, if any.
    pub fn apply_search(
        &mut self,
        ticket: &SearchTicket,
        result: Result<SearchOutcome, ApiError>,
    ) -> Result<Option<NodeId>, TreeError> {
        if !self.is_current_search(ticket) {
            tracing::debug!(query = %ticket.query, "Discarding stale search results");
            return Err(TreeError::Stale);
        }
        let outcome = result?;
        tracing::debug!(query = %ticket.query, matches = outcome.results.len(), "Search completed");
        self.state.search_results = outcome.results;
        Ok(outcome.reveal.map(|reveal| self.reveal_inner(reveal)))
    }

    /// Apply a finished deep-link reveal if no search, restore or cache
    /// invalidation came after it.
    pub fn apply_reveal(
        &mut self,
        ticket: &RevealTicket,
        result: Result<Reveal, ApiError>,
    ) -> Result<NodeId, TreeError> {
        if !self.is_current_reveal(ticket) {
            tracing::debug!(node_id = %ticket.node_id, "Discarding stale reveal");
            return Err(TreeError::Stale);
        }
        let reveal = result?;
        Ok(self.reveal_inner(reveal))
    }

    fn reveal_inner(&mut self, reveal: Reveal) -> NodeId {
        if let Some(roots) = reveal.roots {
            self.state.roots = roots;
        }
        for (parent, children) in reveal.children {
            self.in_flight.remove(&parent);
            self.state.cache_children(parent, children);
        }
        for ancestor in &reveal.ancestors {
            if self.state.children.contains_key(&ancestor.id) {
                self.state.expanded.insert(ancestor.id);
            }
        }

        let id = reveal.target.id;
        let target = self
            .state
            .find_cached(id)
            .cloned()
            .unwrap_or(reveal.target);
        tracing::debug!(node_id = %id, depth = reveal.ancestors.len(), "Revealed node");
        self.state.selected = Some(target);
        id
    }

    // ------------------------------------------------------------------------
    // Edit / save
    // ------------------------------------------------------------------------

    /// Open a draft for `id`, replacing any previous draft.
    pub fn begin_edit(&mut self, id: NodeId) -> Result<&mut NodeDraft, TreeError> {
        let node = self.find(id).cloned().ok_or(TreeError::NotFound(id))?;
        let draft = NodeDraft {
            node_id: id,
            fields: node.fields(),
            original: node,
        };
        Ok(self.draft.insert(draft))
    }

    pub fn draft(&self) -> Option<&NodeDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut NodeDraft> {
        self.draft.as_mut()
    }

    pub fn cancel_edit(&mut self) {
        self.draft = None;
    }

    /// Apply the server's copy of a saved node.
    ///
    /// The draft survives a failed save so it can be retried.
    pub fn apply_saved(&mut self, result: Result<Node, ApiError>) -> Result<(), TreeError> {
        let saved = result?;
        let id = saved.id;
        self.state.replace_node(saved.clone());

        let refreshed = self.state.find_cached(id).cloned().unwrap_or(saved);
        if self.state.selected_id() == Some(id) {
            self.state.selected = Some(refreshed.clone());
        }
        for hit in self.state.search_results.iter_mut().filter(|n| n.id == id) {
            *hit = refreshed.clone();
        }
        if self.draft.as_ref().is_some_and(|d| d.node_id == id) {
            self.draft = None;
        }
        tracing::info!(node_id = %id, "Saved node");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Move / create / resync
    // ------------------------------------------------------------------------

    /// Check that `id` may move beneath `new_parent` (`None` = root).
    ///
    /// Returns the cached node to relocate. Nothing is mutated.
    pub fn prepare_move(&self, id: NodeId, new_parent: Option<NodeId>) -> Result<Node, TreeError> {
        if let Some(parent) = new_parent {
            if parent == id || self.state.is_cached_descendant(parent, id) {
                return Err(TreeError::InvalidMove);
            }
        }
        self.find(id).cloned().ok_or(TreeError::NotFound(id))
    }

    /// Parent, position and sibling count of a cached node.
    pub fn sibling_position(&self, id: NodeId) -> Option<(Option<NodeId>, usize, usize)> {
        let node = self.state.find_cached(id)?;
        let siblings = match node.parent_id {
            None => &self.state.roots,
            Some(parent) => self.state.children.get(&parent)?,
        };
        let index = siblings.iter().position(|n| n.id == id)?;
        Some((node.parent_id, index, siblings.len()))
    }

    /// Branches a resync must re-fetch and the selection it must re-resolve.
    pub fn resync_plan(&self) -> ResyncPlan {
        let mut expanded: Vec<NodeId> = self.state.expanded.iter().copied().collect();
        expanded.sort();
        ResyncPlan {
            expanded,
            selected: self.state.selected_id(),
        }
    }

    /// Resync plan that also fetches the children of `parent`.
    pub fn create_plan(&self, parent: Option<NodeId>) -> ResyncPlan {
        let mut plan = self.resync_plan();
        if let Some(parent) = parent {
            if !plan.expanded.contains(&parent) {
                plan.expanded.push(parent);
            }
        }
        plan
    }

    /// Replace the whole cache with freshly fetched data.
    ///
    /// Expanded ids whose branch failed to load or no longer hangs off the
    /// roots are dropped along with their branch, and the selection is re-resolved by id (cleared if gone).
    /// On error nothing changes.
    pub fn apply_resync(&mut self, result: Result<Resync, ApiError>) -> Result<(), TreeError> {
        let resync = result?;
        let previous_selection = self.state.selected_id();

        self.invalidate();
        self.state.roots = resync.roots;
        for (parent, children) in resync.branches {
            self.state.cache_children(parent, children);
        }

        // Keep only branches hanging off the roots; one whose parent is
        // collapsed was not refetched and cannot be shown
        let mut reachable = HashSet::new();
        let mut pending: Vec<NodeId> = self.state.roots.iter().map(|n| n.id).collect();
        while let Some(id) = pending.pop() {
            if !reachable.insert(id) {
                continue;
            }
            if let Some(children) = self.state.children.get(&id) {
                pending.extend(children.iter().map(|c| c.id));
            }
        }
        self.state.children.retain(|id, _| reachable.contains(id));
        self.state.expanded = self.state.children.keys().copied().collect();

        self.state.selected = previous_selection.and_then(|id| {
            self.state
                .find_cached(id)
                .cloned()
                .or_else(|| resync.selected.filter(|n| n.id == id))
        });
        tracing::info!(
            roots = self.state.roots.len(),
            expanded = self.state.expanded.len(),
            "Resynced tree"
        );
        Ok(())
    }

    /// Resync after a create, then select the new node.
    pub fn apply_created(
        &mut self,
        result: Result<(Node, Resync), ApiError>,
    ) -> Result<Vec<ChildFetch>, TreeError> {
        let (created, resync) = result?;
        self.apply_resync(Ok(resync))?;
        let node = self
            .state
            .find_cached(created.id)
            .cloned()
            .unwrap_or(created);
        Ok(self.select(node))
    }

    fn invalidate(&mut self) {
        self.epoch += 1;
        self.in_flight.clear();
        self.state.children.clear();
        self.state.expanded.clear();
    }

    // ------------------------------------------------------------------------
    // Remove
    // ------------------------------------------------------------------------

    /// Produce the confirmation token needed to delete `id`.
    pub fn request_remove(&self, id: NodeId) -> Result<PendingRemoval, TreeError> {
        let node = self.find(id).ok_or(TreeError::NotFound(id))?;
        Ok(PendingRemoval {
            node_id: id,
            name: node.name.clone(),
        })
    }

    /// Apply a finished delete. On success every piece of client state is
    /// cleared; the caller reloads roots afterwards.
    pub fn apply_removed(
        &mut self,
        pending: PendingRemoval,
        result: Result<(), ApiError>,
    ) -> Result<(), TreeError> {
        result?;
        tracing::info!(node_id = %pending.node_id, name = %pending.name, "Removed node");
        self.clear_all();
        Ok(())
    }

    /// Drop all cached data and cancel every outstanding ticket.
    pub fn clear_all(&mut self) {
        self.invalidate();
        self.state.clear();
        self.search_generation += 1;
        self.populate_generation += 1;
        self.populating = None;
        self.draft = None;
    }

    // ------------------------------------------------------------------------
    // Populate
    // ------------------------------------------------------------------------

    pub fn populating(&self) -> Option<PopulateTicket> {
        self.populating
    }

    /// Start generating children for `id`.
    ///
    /// Refused with [`TreeError::Busy`] while a request for the same node is
    /// outstanding. A request for a different node supersedes the old one,
    /// whose completion will then be discarded.
    pub fn begin_populate(&mut self, id: NodeId) -> Result<PopulateTicket, TreeError> {
        if self.find(id).is_none() {
            return Err(TreeError::NotFound(id));
        }
        if let Some(current) = self.populating {
            if current.node_id == id {
                return Err(TreeError::Busy);
            }
            tracing::debug!(previous = %current.node_id, next = %id, "Superseding populate request");
        }
        self.populate_generation += 1;
        let ticket = PopulateTicket {
            generation: self.populate_generation,
            epoch: self.epoch,
            node_id: id,
        };
        self.populating = Some(ticket);
        Ok(ticket)
    }

    /// Apply a finished populate if it is still the latest request, its node
    /// is still selected and the cache was not rebuilt in the meantime.
    pub fn apply_populate(
        &mut self,
        ticket: PopulateTicket,
        result: Result<PopulateRefresh, ApiError>,
    ) -> Result<(), TreeError> {
        if ticket.generation != self.populate_generation {
            tracing::debug!(node_id = %ticket.node_id, "Discarding superseded populate result");
            return Err(TreeError::Stale);
        }
        self.populating = None;
        let refresh = result?;

        if ticket.epoch != self.epoch {
            tracing::debug!(node_id = %ticket.node_id, "Cache rebuilt since populate began, discarding result");
            return Err(TreeError::Stale);
        }
        if self.state.selected_id() != Some(ticket.node_id) {
            tracing::debug!(node_id = %ticket.node_id, "Selection moved on, discarding populate result");
            return Err(TreeError::Stale);
        }

        let id = refresh.node.id;
        self.state.roots = refresh.roots;
        self.state.replace_node(refresh.node.clone());
        self.in_flight.remove(&id);
        self.state.cache_children(id, refresh.children);
        self.state.expanded.insert(id);
        self.state.selected = Some(self.state.find_cached(id).cloned().unwrap_or(refresh.node));
        tracing::info!(node_id = %id, "Applied generated topics");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Flattened view
    // ------------------------------------------------------------------------

    /// The visible tree, depth first, descending only into expanded nodes
    /// with cached children.
    pub fn rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        for root in &self.state.roots {
            let root_name = single_line(&root.name);
            self.push_rows(root, 0, &root_name, &mut seen, &mut rows);
        }
        rows
    }

    fn push_rows(
        &self,
        node: &Node,
        depth: usize,
        root_name: &str,
        seen: &mut HashSet<NodeId>,
        rows: &mut Vec<TreeRow>,
    ) {
        if !seen.insert(node.id) {
            return;
        }
        let cached = self.state.children_of(node.id);
        let is_expanded = self.state.is_expanded(node.id);
        rows.push(TreeRow {
            id: node.id,
            name: single_line(&node.name),
            depth,
            has_children: node.has_children() || cached.is_some_and(|c| !c.is_empty()),
            is_expanded,
            is_loading: self.in_flight.contains(&node.id),
            root_name: root_name.to_string(),
        });

        if is_expanded {
            for child in cached.unwrap_or_default() {
                self.push_rows(child, depth + 1, root_name, seen, rows);
            }
        }
    }
}

/// Input to [`sync::resync`](super::sync::resync).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResyncPlan {
    pub expanded: Vec<NodeId>,
    pub selected: Option<NodeId>,
}
