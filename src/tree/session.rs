use super::model::{ChildFetch, ExpandStep, PendingRemoval, TreeModel};
use super::sync;
use super::TreeError;
use crate::api::{Node, NodeId, TreeApi};
use futures::future::join_all;
use std::sync::Arc;

/// A [`TreeModel`] paired with the API it loads from, for callers that run one
/// operation at a time.
///
/// Each method awaits its network half and applies the result before
/// returning, so a session never has more than one outstanding request of its
/// own.
pub struct TreeSession<A: ?Sized + TreeApi = dyn TreeApi> {
    api: Arc<A>,
    model: TreeModel,
}

impl<A: ?Sized + TreeApi> TreeSession<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            model: TreeModel::new(),
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn model(&self) -> &TreeModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut TreeModel {
        &mut self.model
    }

    pub async fn load_roots(&mut self) -> Result<(), TreeError> {
        let result = sync::load_roots(self.api.as_ref()).await;
        self.model.apply_roots(result)
    }

    pub async fn expand(&mut self, id: NodeId) -> Result<(), TreeError> {
        match self.model.begin_expand(id) {
            ExpandStep::Fetch(fetch) => self.run_fetches(vec![fetch]).await,
            _ => Ok(()),
        }
    }

    pub fn collapse(&mut self, id: NodeId) {
        self.model.collapse(id);
    }

    /// Select a node and load whatever its expansion needs.
    pub async fn select(&mut self, node: Node) -> Result<(), TreeError> {
        let fetches = self.model.select(node);
        self.run_fetches(fetches).await
    }

    /// Select a node that is already loaded.
    pub async fn select_id(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.model.find(id).cloned().ok_or(TreeError::NotFound(id))?;
        self.select(node).await
    }

    /// Run child fetches concurrently and apply each. All results are applied
    /// before the first error is returned.
    async fn run_fetches(&mut self, fetches: Vec<ChildFetch>) -> Result<(), TreeError> {
        let api = self.api.as_ref();
        let results = join_all(
            fetches
                .into_iter()
                .map(|fetch| async move { (fetch, sync::fetch_children(api, fetch.parent).await) }),
        )
        .await;

        let mut first_error = None;
        for (fetch, result) in results {
            if let Err(e) = self.model.finish_children(fetch, result) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Search and reveal the first match. Returns the revealed node.
    pub async fn search(&mut self, query: &str) -> Result<Option<NodeId>, TreeError> {
        let Some(ticket) = self.model.begin_search(query) else {
            return Ok(None);
        };
        let snapshot = self.model.state().snapshot();
        let result = sync::run_search(self.api.as_ref(), &snapshot, &ticket.query).await;
        self.model.apply_search(&ticket, result)
    }

    /// Reveal and select a node known only by id.
    pub async fn restore(&mut self, id: NodeId) -> Result<NodeId, TreeError> {
        let ticket = self.model.begin_restore(id);
        let snapshot = self.model.state().snapshot();
        let result = sync::restore(self.api.as_ref(), &snapshot, id).await;
        self.model.apply_reveal(&ticket, result)
    }

    /// Save the open draft, if any.
    pub async fn save(&mut self) -> Result<(), TreeError> {
        let Some(draft) = self.model.draft().cloned() else {
            return Ok(());
        };
        let result = sync::save(self.api.as_ref(), &draft).await;
        self.model.apply_saved(result)
    }

    /// Move `id` beneath `new_parent` (`None` = make it a root) at `index`
    /// among its new siblings, or last when `index` is `None`.
    pub async fn move_node(
        &mut self,
        id: NodeId,
        new_parent: Option<NodeId>,
        index: Option<usize>,
    ) -> Result<(), TreeError> {
        let node = self.model.prepare_move(id, new_parent)?;
        let index = index.unwrap_or_else(|| {
            let state = self.model.state();
            match new_parent {
                Some(parent) => state.children_of(parent).map_or(0, <[Node]>::len),
                None => state.roots.len(),
            }
        });
        let order = i32::try_from(index).unwrap_or(i32::MAX);
        let plan = self.model.resync_plan();
        let result = sync::move_node(self.api.as_ref(), &node, new_parent, order, &plan).await;
        self.model.apply_resync(result)
    }

    pub fn request_remove(&self, id: NodeId) -> Result<PendingRemoval, TreeError> {
        self.model.request_remove(id)
    }

    /// Delete a confirmed node, clear all state and reload the roots.
    pub async fn remove(&mut self, pending: PendingRemoval) -> Result<(), TreeError> {
        let result = sync::remove(self.api.as_ref(), &pending).await;
        self.model.apply_removed(pending, result)?;
        self.load_roots().await
    }

    /// Generate child topics for `id` and show them.
    pub async fn populate(&mut self, id: NodeId) -> Result<(), TreeError> {
        let ticket = self.model.begin_populate(id)?;
        let node = self.model.find(id).cloned().ok_or(TreeError::NotFound(id))?;
        let result = sync::populate(self.api.as_ref(), &node).await;
        self.model.apply_populate(ticket, result)
    }

    /// Create a node beneath `parent` and select it.
    pub async fn create(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, TreeError> {
        let plan = self.model.create_plan(parent);
        let result = sync::create(self.api.as_ref(), name, parent, &plan).await;
        let fetches = self.model.apply_created(result)?;
        self.run_fetches(fetches).await?;
        self.model
            .selected()
            .map(|n| n.id)
            .ok_or(TreeError::Stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use pretty_assertions::assert_eq;

    async fn demo_session() -> (Arc<MemoryApi>, TreeSession<MemoryApi>) {
        let api = Arc::new(MemoryApi::demo());
        let mut session = TreeSession::new(api.clone());
        session.load_roots().await.unwrap();
        (api, session)
    }

    #[tokio::test]
    async fn test_expand_twice_fetches_once() {
        let (api, mut session) = demo_session().await;
        session.expand(NodeId(13)).await.unwrap();
        session.collapse(NodeId(13));
        session.expand(NodeId(13)).await.unwrap();
        assert_eq!(api.calls().children_of(NodeId(13)), 1);
    }

    #[tokio::test]
    async fn test_select_id_requires_loaded_node() {
        let (_api, mut session) = demo_session().await;
        assert!(matches!(
            session.select_id(NodeId(4)).await,
            Err(TreeError::NotFound(_))
        ));
        session.select_id(NodeId(1)).await.unwrap();
        assert!(session.model().state().is_expanded(NodeId(1)));
    }

    #[tokio::test]
    async fn test_populate_offline_leaves_state() {
        let (api, mut session) = demo_session().await;
        session.select_id(NodeId(16)).await.unwrap();
        let before = session.model().state().clone();

        api.set_offline(true);
        assert!(session.populate(NodeId(16)).await.is_err());
        assert_eq!(session.model().state(), &before);
        assert_eq!(session.model().populating(), None);
    }

    #[tokio::test]
    async fn test_save_without_draft_is_noop() {
        let (api, mut session) = demo_session().await;
        session.save().await.unwrap();
        assert_eq!(api.calls().update, 0);
    }
}
