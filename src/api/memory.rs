//! In-process [`TreeApi`] backend.
//!
//! Serves `--demo` mode without a server and gives tests a backend whose call
//! counts can be inspected.

use crate::api::{ApiError, NewNode, Node, NodeId, NodeUpdate, TreeApi};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Number of requests served per endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub roots: usize,
    pub children: HashMap<NodeId, usize>,
    pub search: usize,
    pub node: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub populate: usize,
}

impl CallCounts {
    /// Children requests for `parent`.
    pub fn children_of(&self, parent: NodeId) -> usize {
        self.children.get(&parent).copied().unwrap_or(0)
    }

    pub fn total_children(&self) -> usize {
        self.children.values().sum()
    }
}

#[derive(Default)]
struct Store {
    nodes: BTreeMap<NodeId, Node>,
    next_id: i64,
    calls: CallCounts,
}

impl Store {
    fn insert(&mut self, name: &str, description: &str, parent: Option<NodeId>) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        let order = self.child_ids(parent).len() as i32;
        let level = parent
            .and_then(|p| self.nodes.get(&p))
            .and_then(|p| p.level)
            .map_or(0, |l| l + 1);

        let mut node = Node::new(id, name);
        if !description.is_empty() {
            node.description = Some(description.to_string());
        }
        node.parent_id = parent;
        node.node_order = Some(order);
        node.level = Some(level);
        self.nodes.insert(id, node);
        id
    }

    /// Ids of the children of `parent` (roots for `None`) in display order.
    fn child_ids(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        let mut kids: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| n.parent_id == parent)
            .collect();
        kids.sort_by_key(|n| (n.node_order.unwrap_or(i32::MAX), n.id));
        kids.into_iter().map(|n| n.id).collect()
    }

    /// A copy of the stored node with `child_ids` filled in, as the server returns it.
    fn view(&self, id: NodeId) -> Option<Node> {
        let mut node = self.nodes.get(&id)?.clone();
        node.child_ids = Some(self.child_ids(Some(id)));
        Some(node)
    }

    fn views(&self, ids: Vec<NodeId>) -> Vec<Node> {
        ids.into_iter().filter_map(|id| self.view(id)).collect()
    }

    fn is_descendant(&self, candidate: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.nodes.get(&candidate).and_then(|n| n.parent_id);
        let mut steps = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent_id);
        }
        false
    }

    /// Place `id` at `index` among its siblings and renumber them.
    fn reorder(&mut self, id: NodeId, parent: Option<NodeId>, index: usize) {
        let mut siblings: Vec<NodeId> = self
            .child_ids(parent)
            .into_iter()
            .filter(|s| *s != id)
            .collect();
        siblings.insert(index.min(siblings.len()), id);
        for (order, sibling) in siblings.into_iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(&sibling) {
                node.node_order = Some(order as i32);
            }
        }
    }

    fn remove_subtree(&mut self, id: NodeId) {
        for child in self.child_ids(Some(id)) {
            self.remove_subtree(child);
        }
        self.nodes.remove(&id);
    }
}

fn not_found(id: NodeId) -> ApiError {
    ApiError::HttpStatus {
        status: 404,
        message: format!("Node {} not found", id),
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::HttpStatus {
        status: 400,
        message: message.into(),
    }
}

/// Suffixes for the child topics `populate` generates.
const GENERATED_TOPICS: [(&str, &str); 3] = [
    ("Fundamentals", "Core ideas and vocabulary"),
    ("In Practice", "Worked exercises and applications"),
    ("Further Reading", "Where to go next"),
];

/// A [`TreeApi`] backed by an in-memory tree.
#[derive(Default)]
pub struct MemoryApi {
    store: Mutex<Store>,
    offline: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryApi {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// A small learning tree used by `--demo`.
    ///
    /// "Network Protocols" sits three levels below the "Computer Science" root.
    pub fn demo() -> Self {
        let api = Self::new();
        {
            let mut store = api.lock();
            let cs = store.insert("Computer Science", "Root node for the knowledge tree", None);
            let systems = store.insert("Systems", "Main branch: Systems", Some(cs));
            let networking =
                store.insert("Data Communication", "Topic: Data Communication", Some(systems));
            let protocols = store.insert(
                "Network Protocols",
                "How machines agree on the shape of a conversation",
                Some(networking),
            );
            store.insert("TCP", "Reliable ordered byte streams", Some(protocols));
            store.insert("HTTP", "Request/response over TCP", Some(protocols));
            store.insert("Operating Systems", "Topic: Operating Systems", Some(systems));

            let algorithms = store.insert("Algorithms", "Main branch: Algorithms", Some(cs));
            store.insert("Sorting", "Topic: Sorting", Some(algorithms));
            store.insert("Graph Search", "Topic: Graph Search", Some(algorithms));

            let languages =
                store.insert("Programming Languages", "Main branch: Languages", Some(cs));
            let rust = store.insert("Rust", "Topic: Rust", Some(languages));
            if let Some(node) = store.nodes.get_mut(&rust) {
                node.content = Some(
                    "## Ownership\n\nEvery value has a single **owner**.\n\n- Moves transfer ownership\n- Borrows lend access"
                        .to_string(),
                );
                node.examples = Some("let s = String::from(\"hi\");\nlet t = s; // moved".to_string());
                node.references = Some("https://doc.rust-lang.org/book/".to_string());
            }

            let math = store.insert("Mathematics", "Root node for the knowledge tree", None);
            store.insert("Linear Algebra", "Main branch: Linear Algebra", Some(math));
            store.insert("Probability", "Main branch: Probability", Some(math));

            let physical = store.insert("Physical Fitness", "Root node for the knowledge tree", None);
            store.insert("Strength Training", "Main branch: Strength", Some(physical));
            store.insert("Nutrition", "Main branch: Nutrition", Some(physical));
        }
        api
    }

    /// Build a tree from `(id, name, parent)` triples; order follows input order.
    pub fn from_nodes(nodes: &[(i64, &str, Option<i64>)]) -> Self {
        let api = Self::new();
        {
            let mut store = api.lock();
            for (id, name, parent) in nodes {
                let parent = parent.map(NodeId);
                let order = store.child_ids(parent).len() as i32;
                let mut node = Node::new(NodeId(*id), *name);
                node.parent_id = parent;
                node.node_order = Some(order);
                store.nodes.insert(node.id, node);
                store.next_id = store.next_id.max(*id);
            }
        }
        api
    }

    /// Make every call fail with [`ApiError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Snapshot of the per-endpoint call counts.
    pub fn calls(&self) -> CallCounts {
        self.lock().calls.clone()
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self) -> Result<(), ApiError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl TreeApi for MemoryApi {
    async fn roots(&self) -> Result<Vec<Node>, ApiError> {
        self.enter().await?;
        let mut store = self.lock();
        store.calls.roots += 1;
        let ids = store.child_ids(None);
        Ok(store.views(ids))
    }

    async fn children(&self, parent: NodeId) -> Result<Vec<Node>, ApiError> {
        self.enter().await?;
        let mut store = self.lock();
        *store.calls.children.entry(parent).or_insert(0) += 1;
        let ids = store.child_ids(Some(parent));
        let mut children = store.views(ids);
        // The service omits the back-reference on child listings
        for child in &mut children {
            child.parent_id = None;
        }
        Ok(children)
    }

    async fn search(&self, query: &str) -> Result<Vec<Node>, ApiError> {
        self.enter().await?;
        let mut store = self.lock();
        store.calls.search += 1;
        let needle = query.to_lowercase();
        let ids: Vec<NodeId> = store
            .nodes
            .values()
            .filter(|n| n.name.to_lowercase().contains(&needle))
            .map(|n| n.id)
            .collect();
        Ok(store.views(ids))
    }

    async fn node(&self, id: NodeId) -> Result<Node, ApiError> {
        self.enter().await?;
        let mut store = self.lock();
        store.calls.node += 1;
        store.view(id).ok_or_else(|| not_found(id))
    }

    async fn create(&self, new: &NewNode) -> Result<Node, ApiError> {
        self.enter().await?;
        let mut store = self.lock();
        store.calls.create += 1;
        let parent = new.parent.map(|p| p.id);
        if let Some(parent) = parent {
            if !store.nodes.contains_key(&parent) {
                return Err(bad_request(format!("Parent {} not found", parent)));
            }
        }
        let id = store.insert(&new.name, "", parent);
        store.view(id).ok_or_else(|| not_found(id))
    }

    async fn update(&self, id: NodeId, update: &NodeUpdate) -> Result<Node, ApiError> {
        self.enter().await?;
        let mut store = self.lock();
        store.calls.update += 1;
        if !store.nodes.contains_key(&id) {
            return Err(not_found(id));
        }
        if let Some(parent) = update.parent_id {
            if parent == id || store.is_descendant(parent, id) {
                return Err(bad_request("A node cannot be moved beneath itself"));
            }
            if !store.nodes.contains_key(&parent) {
                return Err(bad_request(format!("Parent {} not found", parent)));
            }
        }

        let level = update
            .parent_id
            .and_then(|p| store.nodes.get(&p))
            .and_then(|p| p.level)
            .map_or(0, |l| l + 1);
        if let Some(node) = store.nodes.get_mut(&id) {
            node.name = update.name.clone();
            node.description = update.description.clone();
            node.content = update.content.clone();
            node.examples = update.examples.clone();
            node.references = update.references.clone();
            node.parent_id = update.parent_id;
            node.level = update.level.or(Some(level));
        }
        let index = update
            .node_order
            .map_or(usize::MAX, |o| o.max(0) as usize);
        store.reorder(id, update.parent_id, index);
        store.view(id).ok_or_else(|| not_found(id))
    }

    async fn delete(&self, id: NodeId) -> Result<(), ApiError> {
        self.enter().await?;
        let mut store = self.lock();
        store.calls.delete += 1;
        if !store.nodes.contains_key(&id) {
            return Err(not_found(id));
        }
        store.remove_subtree(id);
        Ok(())
    }

    async fn populate(&self, node: &Node) -> Result<(), ApiError> {
        self.enter().await?;
        let mut store = self.lock();
        store.calls.populate += 1;
        let target = store
            .nodes
            .values()
            .find(|n| n.name == node.name)
            .map(|n| n.id)
            .ok_or_else(|| bad_request(format!("Node not found: {}", node.name)))?;

        let existing: Vec<String> = store
            .child_ids(Some(target))
            .into_iter()
            .filter_map(|id| store.nodes.get(&id).map(|n| n.name.clone()))
            .collect();
        for (suffix, description) in GENERATED_TOPICS {
            let name = format!("{}: {}", node.name, suffix);
            if !existing.contains(&name) {
                store.insert(&name, description, Some(target));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_demo_roots_in_order() {
        let api = MemoryApi::demo();
        let roots = api.roots().await.unwrap();
        assert_eq!(
            names(&roots),
            vec!["Computer Science", "Mathematics", "Physical Fitness"]
        );
        assert!(roots.iter().all(|r| r.has_children()));
    }

    #[tokio::test]
    async fn test_children_omit_parent_and_count_calls() {
        let api = MemoryApi::from_nodes(&[(1, "Root", None), (2, "A", Some(1)), (3, "B", Some(1))]);
        let children = api.children(NodeId(1)).await.unwrap();
        assert_eq!(names(&children), vec!["A", "B"]);
        assert!(children.iter().all(|c| c.parent_id.is_none()));
        assert_eq!(api.calls().children_of(NodeId(1)), 1);
    }

    #[tokio::test]
    async fn test_node_keeps_parent_reference() {
        let api = MemoryApi::from_nodes(&[(1, "Root", None), (2, "A", Some(1))]);
        let node = api.node(NodeId(2)).await.unwrap();
        assert_eq!(node.parent_id, Some(NodeId(1)));
        assert!(api.node(NodeId(42)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let api = MemoryApi::demo();
        let results = api.search("network").await.unwrap();
        assert_eq!(names(&results), vec!["Network Protocols"]);
        assert!(api.search("NOTHING").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_moves_and_reorders() {
        let api = MemoryApi::from_nodes(&[
            (1, "Root", None),
            (2, "A", Some(1)),
            (3, "B", Some(1)),
            (4, "Other", None),
        ]);
        let b = api.node(NodeId(3)).await.unwrap();
        api.update(NodeId(3), &NodeUpdate::relocate(&b, Some(NodeId(1)), 0))
            .await
            .unwrap();
        assert_eq!(names(&api.children(NodeId(1)).await.unwrap()), vec!["B", "A"]);

        let a = api.node(NodeId(2)).await.unwrap();
        api.update(NodeId(2), &NodeUpdate::relocate(&a, Some(NodeId(4)), 0))
            .await
            .unwrap();
        assert_eq!(names(&api.children(NodeId(4)).await.unwrap()), vec!["A"]);
    }

    #[tokio::test]
    async fn test_update_rejects_cycle() {
        let api = MemoryApi::from_nodes(&[(1, "Root", None), (2, "A", Some(1))]);
        let root = api.node(NodeId(1)).await.unwrap();
        let err = api
            .update(NodeId(1), &NodeUpdate::relocate(&root, Some(NodeId(2)), 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_delete_removes_subtree() {
        let api = MemoryApi::from_nodes(&[(1, "Root", None), (2, "A", Some(1)), (3, "A1", Some(2))]);
        api.delete(NodeId(2)).await.unwrap();
        assert_eq!(api.len(), 1);
        assert!(api.delete(NodeId(2)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_populate_adds_children_once() {
        let api = MemoryApi::from_nodes(&[(1, "Rust", None)]);
        let node = api.node(NodeId(1)).await.unwrap();
        api.populate(&node).await.unwrap();
        api.populate(&node).await.unwrap();
        let children = api.children(NodeId(1)).await.unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].name, "Rust: Fundamentals");
    }

    #[tokio::test]
    async fn test_offline_fails_every_call() {
        let api = MemoryApi::demo();
        api.set_offline(true);
        assert!(matches!(api.roots().await, Err(ApiError::Unavailable)));
        api.set_offline(false);
        assert!(api.roots().await.is_ok());
    }
}
