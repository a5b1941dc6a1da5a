//! Integration tests for the tree client model driven through `TreeSession`.
//!
//! Each test runs against its own in-memory demo tree. `MemoryApi` counts
//! requests per endpoint, which is how cache reuse is observed.
//!
//! Demo ids: Computer Science 1 > Systems 2 > Data Communication 3 >
//! Network Protocols 4 > TCP 5; Mathematics 13; Physical Fitness 16.

use knowtree::api::{MemoryApi, Node, NodeId};
use knowtree::tree::{sync, TreeError, TreeSession, TreeState};
use pretty_assertions::assert_eq;
use std::sync::Arc;

async fn demo_session() -> (Arc<MemoryApi>, TreeSession<MemoryApi>) {
    let api = Arc::new(MemoryApi::demo());
    let mut session = TreeSession::new(api.clone());
    session.load_roots().await.unwrap();
    (api, session)
}

fn names(nodes: &[Node]) -> Vec<&str> {
    nodes.iter().map(|n| n.name.as_str()).collect()
}

// ============================================================================
// Lazy loading
// ============================================================================

#[tokio::test]
async fn test_expand_collapse_expand_fetches_children_once() {
    let (api, mut session) = demo_session().await;

    session.expand(NodeId(1)).await.unwrap();
    session.collapse(NodeId(1));
    assert!(!session.model().state().is_expanded(NodeId(1)));
    session.expand(NodeId(1)).await.unwrap();

    assert_eq!(api.calls().children_of(NodeId(1)), 1);
    assert!(session.model().state().is_expanded(NodeId(1)));
    assert_eq!(
        names(session.model().state().children_of(NodeId(1)).unwrap()),
        vec!["Systems", "Algorithms", "Programming Languages"]
    );
}

#[tokio::test]
async fn test_failed_expand_leaves_cache_untouched() {
    let (api, mut session) = demo_session().await;
    session.expand(NodeId(1)).await.unwrap();
    let before = session.model().state().clone();

    api.set_offline(true);
    let err = session.expand(NodeId(13)).await.unwrap_err();
    assert!(matches!(err, TreeError::Fetch(_)));

    assert_eq!(session.model().state(), &before);
}

// ============================================================================
// Structural edits
// ============================================================================

#[tokio::test]
async fn test_move_under_itself_is_rejected_without_request() {
    let (api, mut session) = demo_session().await;
    session.expand(NodeId(1)).await.unwrap();
    session.expand(NodeId(2)).await.unwrap();
    let before = session.model().state().clone();

    let err = session.move_node(NodeId(1), Some(NodeId(1)), None).await.unwrap_err();
    assert!(matches!(err, TreeError::InvalidMove));

    let err = session.move_node(NodeId(1), Some(NodeId(3)), None).await.unwrap_err();
    assert!(matches!(err, TreeError::InvalidMove));

    assert_eq!(api.calls().update, 0);
    assert_eq!(session.model().state(), &before);
}

#[tokio::test]
async fn test_move_resyncs_visible_branches() {
    let (api, mut session) = demo_session().await;
    session.expand(NodeId(1)).await.unwrap();
    session.expand(NodeId(13)).await.unwrap();

    // Algorithms (8) becomes the last child of Mathematics
    session.move_node(NodeId(8), Some(NodeId(13)), None).await.unwrap();

    let state = session.model().state();
    assert_eq!(
        names(state.children_of(NodeId(1)).unwrap()),
        vec!["Systems", "Programming Languages"]
    );
    assert_eq!(
        names(state.children_of(NodeId(13)).unwrap()),
        vec!["Linear Algebra", "Probability", "Algorithms"]
    );
    assert_eq!(api.calls().update, 1);
}

#[tokio::test]
async fn test_remove_clears_state_before_reload() {
    let (api, mut session) = demo_session().await;
    session.expand(NodeId(1)).await.unwrap();
    session.select_id(NodeId(2)).await.unwrap();
    session.model_mut().begin_search("sys");

    let pending = session.request_remove(NodeId(2)).unwrap();
    let result = sync::remove(api.as_ref(), &pending).await;
    session.model_mut().apply_removed(pending, result).unwrap();

    assert_eq!(session.model().state(), &TreeState::default());
    assert!(session.model().selected().is_none());

    session.load_roots().await.unwrap();
    assert_eq!(
        names(&session.model().state().roots),
        vec!["Computer Science", "Mathematics", "Physical Fitness"]
    );
    assert!(session.model().state().children.is_empty());
}

#[tokio::test]
async fn test_failed_remove_keeps_everything() {
    let (api, mut session) = demo_session().await;
    session.expand(NodeId(1)).await.unwrap();
    let before = session.model().state().clone();

    api.set_offline(true);
    let pending = session.request_remove(NodeId(2)).unwrap();
    assert!(session.remove(pending).await.is_err());
    assert_eq!(session.model().state(), &before);
}

#[tokio::test]
async fn test_create_selects_new_child() {
    let (_api, mut session) = demo_session().await;
    let id = session.create("Topology", Some(NodeId(13))).await.unwrap();

    let selected = session.model().selected().unwrap();
    assert_eq!(selected.id, id);
    assert_eq!(selected.parent_id, Some(NodeId(13)));
    assert!(session.model().state().is_expanded(NodeId(13)));
}

// ============================================================================
// Ancestor paths
// ============================================================================

#[tokio::test]
async fn test_restore_builds_root_to_leaf_path() {
    let api = Arc::new(MemoryApi::demo());
    let mut session = TreeSession::new(api);

    // Nothing cached yet: the whole chain comes from the service
    let id = session.restore(NodeId(5)).await.unwrap();
    assert_eq!(id, NodeId(5));

    let crumbs = session.model().breadcrumbs();
    assert_eq!(
        names(&crumbs),
        vec![
            "Computer Science",
            "Systems",
            "Data Communication",
            "Network Protocols",
            "TCP"
        ]
    );
    for ancestor in &crumbs[..4] {
        assert!(session.model().state().is_expanded(ancestor.id));
    }
}

#[test]
fn test_ancestor_path_truncates_at_uncached_parent() {
    let mut state = TreeState::default();
    state.roots = vec![Node::new(NodeId(1), "Root")];
    state.cache_children(NodeId(1), vec![Node::new(NodeId(2), "Branch")]);

    // 3 was never fetched, so the walk from 4 stops there
    let mut leaf = Node::new(NodeId(4), "Leaf");
    leaf.parent_id = Some(NodeId(3));
    assert!(state.ancestor_path(&leaf).is_empty());

    let mut twig = Node::new(NodeId(5), "Twig");
    twig.parent_id = Some(NodeId(2));
    assert_eq!(names(&state.ancestor_path(&twig)), vec!["Root", "Branch"]);
}

// ============================================================================
// Overlapping requests
// ============================================================================

#[tokio::test]
async fn test_overlapping_populate_applies_only_latest() {
    let (api, mut session) = demo_session().await;

    session.select_id(NodeId(13)).await.unwrap();
    let first = session.model_mut().begin_populate(NodeId(13)).unwrap();
    let math = session.model().find(NodeId(13)).cloned().unwrap();

    session.select_id(NodeId(16)).await.unwrap();
    let second = session.model_mut().begin_populate(NodeId(16)).unwrap();
    let fitness = session.model().find(NodeId(16)).cloned().unwrap();

    // Both complete, the superseded one first
    let first_result = sync::populate(api.as_ref(), &math).await;
    let second_result = sync::populate(api.as_ref(), &fitness).await;

    let err = session.model_mut().apply_populate(first, first_result).unwrap_err();
    assert!(matches!(err, TreeError::Stale));
    assert_eq!(
        names(session.model().state().children_of(NodeId(13)).unwrap()),
        vec!["Linear Algebra", "Probability"]
    );

    session.model_mut().apply_populate(second, second_result).unwrap();
    let children = session.model().state().children_of(NodeId(16)).unwrap();
    assert!(children.len() > 2);
    assert!(children[2..]
        .iter()
        .all(|c| c.name.starts_with("Physical Fitness: ")));
    assert!(session.model().populating().is_none());
    assert_eq!(session.model().state().selected_id(), Some(NodeId(16)));
}

#[tokio::test]
async fn test_populate_resolving_after_newer_one_is_discarded() {
    let (api, mut session) = demo_session().await;

    session.select_id(NodeId(13)).await.unwrap();
    let first = session.model_mut().begin_populate(NodeId(13)).unwrap();
    let math = session.model().find(NodeId(13)).cloned().unwrap();

    session.select_id(NodeId(16)).await.unwrap();
    let second = session.model_mut().begin_populate(NodeId(16)).unwrap();
    let fitness = session.model().find(NodeId(16)).cloned().unwrap();

    let first_result = sync::populate(api.as_ref(), &math).await;
    let second_result = sync::populate(api.as_ref(), &fitness).await;

    // The newer request lands first
    session.model_mut().apply_populate(second, second_result).unwrap();
    let after_second = session.model().state().clone();

    let err = session.model_mut().apply_populate(first, first_result).unwrap_err();
    assert!(matches!(err, TreeError::Stale));

    assert_eq!(session.model().state(), &after_second);
    assert_eq!(session.model().state().selected_id(), Some(NodeId(16)));
    assert!(session
        .model()
        .state()
        .children_of(NodeId(16))
        .unwrap()
        .iter()
        .any(|c| c.name.starts_with("Physical Fitness: ")));
    assert!(session.model().populating().is_none());
}

#[tokio::test]
async fn test_populate_same_node_twice_is_busy() {
    let (_api, mut session) = demo_session().await;
    session.select_id(NodeId(13)).await.unwrap();
    session.model_mut().begin_populate(NodeId(13)).unwrap();

    let err = session.populate(NodeId(13)).await.unwrap_err();
    assert!(matches!(err, TreeError::Busy));
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_reveals_deep_match() {
    let (_api, mut session) = demo_session().await;

    let revealed = session.search("network").await.unwrap();
    assert_eq!(revealed, Some(NodeId(4)));

    let model = session.model();
    assert_eq!(names(&model.state().search_results), vec!["Network Protocols"]);
    assert_eq!(model.state().selected_id(), Some(NodeId(4)));
    for id in [NodeId(1), NodeId(2), NodeId(3)] {
        assert!(model.state().is_expanded(id));
    }

    let row = model
        .rows()
        .into_iter()
        .find(|r| r.id == NodeId(4))
        .unwrap();
    assert_eq!(row.depth, 3);
    assert_eq!(row.root_name, "Computer Science");
}

#[tokio::test]
async fn test_search_without_matches_keeps_selection() {
    let (_api, mut session) = demo_session().await;
    session.select_id(NodeId(13)).await.unwrap();

    assert_eq!(session.search("quaternion").await.unwrap(), None);
    assert!(session.model().state().search_results.is_empty());
    assert_eq!(session.model().state().selected_id(), Some(NodeId(13)));
}

#[tokio::test]
async fn test_search_finishing_after_move_is_discarded() {
    let (api, mut session) = demo_session().await;
    session.expand(NodeId(1)).await.unwrap();
    session.expand(NodeId(2)).await.unwrap();

    let ticket = session.model_mut().begin_search("network").unwrap();
    let snapshot = session.model().state().snapshot();
    let outcome = sync::run_search(api.as_ref(), &snapshot, &ticket.query).await;

    // Data Communication moves under Mathematics before the search lands
    session.move_node(NodeId(3), Some(NodeId(13)), None).await.unwrap();
    let after_move = session.model().state().clone();
    assert_eq!(
        names(after_move.children_of(NodeId(2)).unwrap()),
        vec!["Operating Systems"]
    );

    let err = session.model_mut().apply_search(&ticket, outcome).unwrap_err();
    assert!(matches!(err, TreeError::Stale));
    assert_eq!(session.model().state(), &after_move);
    assert!(session.model().search_needs_retry(&ticket));

    // Running it again finds the node at its new place
    assert_eq!(session.search("network").await.unwrap(), Some(NodeId(4)));
    assert_eq!(
        names(&session.model().breadcrumbs()),
        vec!["Mathematics", "Data Communication", "Network Protocols"]
    );
}
