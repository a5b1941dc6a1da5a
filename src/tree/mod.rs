//! Lazily loaded, editable client view of the server-held knowledge tree.
//!
//! The tree is split into three layers:
//!
//! - [`state`] - the cached data itself ([`TreeState`]) and pure queries over it
//!   (lookup, ancestor path, breadcrumbs)
//! - [`model`] - [`TreeModel`], the only thing that mutates state. Every network
//!   operation is split into a synchronous `begin_*` step that hands out a ticket
//!   and an `apply_*` step that checks the ticket before touching state
//! - [`sync`] - the async halves: what to fetch for each ticket, run against any
//!   [`TreeApi`](crate::api::TreeApi)
//!
//! [`TreeSession`] glues the three together for sequential callers (the CLI
//! start-up path and tests). The TUI runs the `sync` halves in spawned tasks
//! and applies their results as they arrive.

mod model;
mod session;
mod state;
pub mod sync;

pub use model::{
    ChildFetch, ExpandStep, NodeDraft, PendingRemoval, PopulateTicket, ResyncPlan, RevealTicket,
    SearchTicket, TreeModel, TreeRow,
};
pub use session::TreeSession;
pub use state::{CacheSnapshot, TreeState};
pub use sync::{PopulateRefresh, Resync, Reveal, SearchOutcome};

use crate::api::{ApiError, NodeId};
use thiserror::Error;

/// Failures of tree operations. None of them are fatal to the session.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The collaborator call failed; cached state is untouched.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] ApiError),
    /// A node cannot become its own parent or the child of its descendant.
    #[error("A node cannot be moved beneath itself")]
    InvalidMove,
    #[error("Node {0} is not loaded")]
    NotFound(NodeId),
    /// A populate request for this node is already outstanding.
    #[error("Already generating topics for this node")]
    Busy,
    /// A newer request superseded this result, which was discarded.
    #[error("Result superseded by a newer request")]
    Stale,
}

impl TreeError {
    /// Short form for the status bar.
    pub fn summary(&self) -> String {
        match self {
            TreeError::Fetch(e) => e.summary(),
            other => other.to_string(),
        }
    }
}
