use crate::api::{Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The partially materialized client view of the tree.
///
/// `children` is a cache keyed by parent id, not a source of truth: it is
/// dropped wholesale after structural edits. `expanded` only ever contains
/// ids whose children are cached or being fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeState {
    pub roots: Vec<Node>,
    pub children: HashMap<NodeId, Vec<Node>>,
    pub expanded: HashSet<NodeId>,
    pub selected: Option<Node>,
    /// Matches of the active search; empty when no search is active.
    pub search_results: Vec<Node>,
}

impl TreeState {
    /// Find a node in `roots` or any cached child array.
    pub fn find_cached(&self, id: NodeId) -> Option<&Node> {
        self.roots
            .iter()
            .chain(self.children.values().flatten())
            .find(|n| n.id == id)
    }

    pub fn children_of(&self, id: NodeId) -> Option<&[Node]> {
        self.children.get(&id).map(Vec::as_slice)
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn selected_id(&self) -> Option<NodeId> {
        self.selected.as_ref().map(|n| n.id)
    }

    /// Ancestors of `node` in root-to-leaf order, excluding the node itself.
    ///
    /// Each `parent_id` is resolved by linear lookup through the cache. The
    /// walk stops at a root, at a parent that is not cached, or at an id it has
    /// already visited, so a corrupt cycle truncates instead of looping.
    pub fn ancestor_path(&self, node: &Node) -> Vec<Node> {
        let mut path = Vec::new();
        let mut seen = HashSet::from([node.id]);
        let mut next = node.parent_id;

        while let Some(parent_id) = next {
            if !seen.insert(parent_id) {
                tracing::warn!(node_id = %node.id, parent_id = %parent_id, "Cycle in parent chain");
                break;
            }
            let Some(parent) = self.find_cached(parent_id) else {
                break;
            };
            path.push(parent.clone());
            next = parent.parent_id;
        }

        path.reverse();
        path
    }

    /// The ancestor path followed by the node itself.
    pub fn breadcrumbs(&self, node: &Node) -> Vec<Node> {
        let mut crumbs = self.ancestor_path(node);
        crumbs.push(node.clone());
        crumbs
    }

    /// True if `candidate` has `ancestor` somewhere on its cached parent chain.
    pub fn is_cached_descendant(&self, candidate: NodeId, ancestor: NodeId) -> bool {
        match self.find_cached(candidate) {
            Some(node) => self.ancestor_path(node).iter().any(|a| a.id == ancestor),
            None => false,
        }
    }

    /// Replace a cached node by identifier.
    ///
    /// Looks in `roots` when the node has no parent and in
    /// `children[parent]` otherwise, falling back to a scan of every array.
    /// A parent link missing from `node` is taken from the cached copy.
    /// Returns false if the node was not cached.
    pub fn replace_node(&mut self, mut node: Node) -> bool {
        let id = node.id;
        if let Some(cached) = self.find_cached(id) {
            if node.parent_id.is_none() {
                node.parent_id = cached.parent_id;
            }
            if node.child_ids.is_none() {
                node.child_ids = cached.child_ids.clone();
            }
        }

        let home = match node.parent_id {
            None => Some(&mut self.roots),
            Some(parent) => self.children.get_mut(&parent),
        };
        if let Some(slot) = home.and_then(|arr| arr.iter_mut().find(|n| n.id == id)) {
            *slot = node;
            return true;
        }

        let all = self
            .roots
            .iter_mut()
            .chain(self.children.values_mut().flatten());
        for slot in all {
            if slot.id == id {
                *slot = node;
                return true;
            }
        }
        false
    }

    /// Cache `children` under `parent`, stamping each child's parent link.
    pub fn cache_children(&mut self, parent: NodeId, mut children: Vec<Node>) {
        for child in &mut children {
            child.parent_id = Some(parent);
        }
        self.children.insert(parent, children);
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Copy of what the cache knows, for planning fetches off the state owner.
    pub fn snapshot(&self) -> CacheSnapshot {
        let mut nodes = HashMap::new();
        for node in self.roots.iter().chain(self.children.values().flatten()) {
            nodes.entry(node.id).or_insert_with(|| node.clone());
        }
        CacheSnapshot {
            nodes,
            cached_parents: self.children.keys().copied().collect(),
            roots_loaded: !self.roots.is_empty(),
        }
    }
}

/// Read-only copy of the cache handed to background fetch planning.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    pub nodes: HashMap<NodeId, Node>,
    /// Parents whose children are cached.
    pub cached_parents: HashSet<NodeId>,
    pub roots_loaded: bool,
}

impl CacheSnapshot {
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn has_children_cached(&self, id: NodeId) -> bool {
        self.cached_parents.contains(&id)
    }
}
