use crate::api::{ApiError, HttpClient, Node, NodeFields, NodeId, QuizResult, TreeApi};
use crate::config::Config;
use crate::keybindings::KeybindingRegistry;
use crate::progress::TopicProgress;
use crate::theme::{StyleMap, ThemeVariant};
use crate::tree::{
    ChildFetch, PendingRemoval, PopulateRefresh, PopulateTicket, Resync, Reveal, RevealTicket,
    SearchOutcome, SearchTicket, TreeModel, TreeRow,
};
use ratatui::style::Style;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Upper bound for the detail panel scroll offset (ratatui scrolls by u16).
pub const MAX_SCROLL: usize = u16::MAX as usize;

/// How long a status message stays visible.
const STATUS_TTL: Duration = Duration::from_secs(3);

// ============================================================================
// View and Focus Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Tree on the left, selected node on the right.
    Tree,
    /// Quiz progress per topic.
    Progress,
}

/// Which panel has focus in the tree view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Detail,
}

// ============================================================================
// Dialogs
// ============================================================================

/// Pending confirmation for destructive operations.
pub enum ConfirmAction {
    Remove(PendingRemoval),
}

/// Field of a node being edited in the edit dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Name,
    Description,
    Content,
    Examples,
    References,
}

impl EditField {
    pub const ALL: [EditField; 5] = [
        Self::Name,
        Self::Description,
        Self::Content,
        Self::Examples,
        Self::References,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Description => "Description",
            Self::Content => "Content",
            Self::Examples => "Examples",
            Self::References => "References",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Name => Self::Description,
            Self::Description => Self::Content,
            Self::Content => Self::Examples,
            Self::Examples => Self::References,
            Self::References => Self::Name,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Name => Self::References,
            Self::Description => Self::Name,
            Self::Content => Self::Description,
            Self::Examples => Self::Content,
            Self::References => Self::Examples,
        }
    }

    /// Multi-line fields take Enter as a newline.
    pub fn is_multiline(self) -> bool {
        !matches!(self, Self::Name)
    }

    pub fn value(self, fields: &NodeFields) -> &str {
        match self {
            Self::Name => &fields.name,
            Self::Description => &fields.description,
            Self::Content => &fields.content,
            Self::Examples => &fields.examples,
            Self::References => &fields.references,
        }
    }

    pub fn value_mut(self, fields: &mut NodeFields) -> &mut String {
        match self {
            Self::Name => &mut fields.name,
            Self::Description => &mut fields.description,
            Self::Content => &mut fields.content,
            Self::Examples => &mut fields.examples,
            Self::References => &mut fields.references,
        }
    }
}

/// State machine for the ask dialog.
pub enum AskState {
    Input { input: String },
    Waiting { question: String },
    Answered {
        question: String,
        answer: String,
        scroll: usize,
    },
}

/// Modal dialog capturing all input while open.
pub enum Dialog {
    /// Editing the model's draft; the draft itself lives in [`TreeModel`].
    Edit { field: EditField, saving: bool },
    /// Naming a new node beneath `parent` (`None` = new root).
    Create {
        parent: Option<NodeId>,
        parent_name: Option<String>,
        input: String,
    },
    Ask(AskState),
}

/// Quiz history shown in the progress view.
pub enum ProgressState {
    Loading,
    Loaded(Vec<TopicProgress>),
    Failed(String),
}

// ============================================================================
// Background events
// ============================================================================

/// Completions of background tasks, applied by the event loop in arrival order.
pub enum AppEvent {
    RootsLoaded(Result<Vec<Node>, ApiError>),
    ChildrenLoaded {
        fetch: ChildFetch,
        result: Result<Vec<Node>, ApiError>,
    },
    SearchCompleted {
        ticket: SearchTicket,
        result: Result<SearchOutcome, ApiError>,
    },
    /// Deep-link path restoration finished.
    Revealed {
        ticket: RevealTicket,
        result: Result<Reveal, ApiError>,
    },
    Saved(Result<Node, ApiError>),
    /// A move or reload resynced the tree. `action` names it for the status bar.
    Resynced {
        action: &'static str,
        result: Result<Resync, ApiError>,
    },
    Created(Result<(Node, Resync), ApiError>),
    Removed {
        pending: PendingRemoval,
        result: Result<(), ApiError>,
    },
    Populated {
        ticket: PopulateTicket,
        result: Result<PopulateRefresh, ApiError>,
    },
    AskAnswered {
        question: String,
        result: Result<String, ApiError>,
    },
    HistoryLoaded(Result<Vec<QuizResult>, ApiError>),
    /// A background task panicked; the message is shown in the status bar.
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state
pub struct App {
    pub api: Arc<dyn TreeApi>,
    /// Quiz, history and ask endpoints. `None` in demo mode.
    pub learning: Option<Arc<HttpClient>>,

    // Theme
    pub theme_variant: ThemeVariant,
    pub theme: StyleMap,
    pub keybindings: KeybindingRegistry,

    pub model: TreeModel,

    // UI State
    pub view: View,
    pub focus: Focus,
    /// Cursor position in the flattened tree.
    pub selected_row: usize,
    /// Detail panel scroll offset.
    pub scroll_offset: usize,
    /// Visible lines of the detail panel at last render.
    pub detail_visible_lines: usize,

    // Search
    pub search_mode: bool,
    pub search_input: String,
    pub search_debounce: Option<Instant>,
    pub search_debounce_after: Duration,
    pub pending_search: Option<String>,
    /// Running search or deep-link reveal.
    pub search_handle: Option<JoinHandle<()>>,

    /// Running populate request, aborted when superseded.
    pub populate_handle: Option<JoinHandle<()>>,

    /// Node marked for re-parenting with the drop keys.
    pub move_mark: Option<NodeId>,

    pub pending_confirm: Option<ConfirmAction>,
    pub dialog: Option<Dialog>,

    // Progress view
    pub progress: Option<ProgressState>,
    pub progress_selected: usize,

    pub status_message: Option<(Cow<'static, str>, Instant)>,

    pub show_help: bool,
    pub help_scroll_offset: usize,

    /// Dirty flag to skip unnecessary frame renders
    pub needs_redraw: bool,
    /// Loading spinner frame, advanced by the tick handler.
    pub spinner_frame: usize,
}

impl App {
    pub fn new(api: Arc<dyn TreeApi>, learning: Option<Arc<HttpClient>>, config: &Config) -> Self {
        let theme_variant = ThemeVariant::from_str_name(&config.theme).unwrap_or_else(|| {
            tracing::warn!(theme = %config.theme, "Unknown theme, using dark");
            ThemeVariant::Dark
        });

        let mut keybindings = KeybindingRegistry::new();
        for warning in keybindings.apply_overrides(&config.keybindings) {
            tracing::warn!("{}", warning);
        }

        Self {
            api,
            learning,
            theme_variant,
            theme: StyleMap::from_palette(&theme_variant.palette()),
            keybindings,
            model: TreeModel::new(),
            view: View::Tree,
            focus: Focus::Tree,
            selected_row: 0,
            scroll_offset: 0,
            detail_visible_lines: 0,
            search_mode: false,
            search_input: String::new(),
            search_debounce: None,
            search_debounce_after: config.search_debounce(),
            pending_search: None,
            search_handle: None,
            populate_handle: None,
            move_mark: None,
            pending_confirm: None,
            dialog: None,
            progress: None,
            progress_selected: 0,
            status_message: None,
            show_help: false,
            help_scroll_offset: 0,
            needs_redraw: true,
            spinner_frame: 0,
        }
    }

    /// Resolve a semantic role name to its `Style`.
    pub fn style(&self, role: &str) -> Style {
        self.theme.resolve(role)
    }

    pub fn set_theme(&mut self, variant: ThemeVariant) {
        self.theme_variant = variant;
        self.theme = StyleMap::from_palette(&variant.palette());
        self.needs_redraw = true;
    }

    /// Cycle to the next theme variant and return its name.
    pub fn cycle_theme(&mut self) -> &'static str {
        let next = self.theme_variant.next();
        self.set_theme(next);
        next.name()
    }

    // ------------------------------------------------------------------------
    // Tree cursor
    // ------------------------------------------------------------------------

    pub fn rows(&self) -> Vec<TreeRow> {
        self.model.rows()
    }

    /// Node under the cursor.
    pub fn cursor_node(&self) -> Option<Node> {
        let rows = self.rows();
        let row = rows.get(self.selected_row)?;
        self.model.find(row.id).cloned()
    }

    /// Node the detail panel shows: the selection, else the cursor.
    pub fn current_node(&self) -> Option<Node> {
        self.model.selected().cloned().or_else(|| self.cursor_node())
    }

    pub fn nav_up(&mut self) {
        if self.selected_row > 0 {
            self.move_cursor(self.selected_row - 1);
        }
    }

    pub fn nav_down(&mut self) {
        let len = self.rows().len();
        if self.selected_row + 1 < len {
            self.move_cursor(self.selected_row + 1);
        }
    }

    /// Put the cursor on row `index` and show that node, without expanding it.
    pub fn move_cursor(&mut self, index: usize) {
        self.selected_row = index;
        if let Some(node) = self.cursor_node() {
            if self.model.state().selected_id() != Some(node.id) {
                self.scroll_offset = 0;
            }
            self.model.focus(node);
        }
    }

    /// Move the cursor to the row of `id`, if it is visible.
    pub fn cursor_to(&mut self, id: NodeId) -> bool {
        match self.rows().iter().position(|r| r.id == id) {
            Some(index) => {
                self.selected_row = index;
                true
            }
            None => false,
        }
    }

    /// Re-align the cursor with the model's selection after the tree changed.
    pub fn sync_cursor(&mut self) {
        let selected = self.model.state().selected_id();
        if selected.is_some_and(|id| self.cursor_to(id)) {
            return;
        }
        let len = self.rows().len();
        self.selected_row = self.selected_row.min(len.saturating_sub(1));
    }

    // ------------------------------------------------------------------------
    // Detail scrolling
    // ------------------------------------------------------------------------

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(MAX_SCROLL);
    }

    /// Clamp scroll offset to the content height.
    pub fn clamp_scroll(&mut self, content_lines: usize) {
        let max_scroll = content_lines.saturating_sub(self.detail_visible_lines);
        self.scroll_offset = self.scroll_offset.min(max_scroll).min(MAX_SCROLL);
    }

    // ------------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------------

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired. Returns true if a message was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() >= STATUS_TTL {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    /// Whether background work worth animating is running.
    pub fn is_busy(&self) -> bool {
        self.model.populating().is_some()
            || matches!(self.progress, Some(ProgressState::Loading))
            || matches!(self.dialog, Some(Dialog::Ask(AskState::Waiting { .. })))
    }

    /// Abort the search or reveal task, if any.
    pub fn abort_search(&mut self) {
        if let Some(handle) = self.search_handle.take() {
            handle.abort();
            tracing::debug!("Aborted search task");
        }
    }

    pub fn abort_populate(&mut self) {
        if let Some(handle) = self.populate_handle.take() {
            handle.abort();
            tracing::debug!("Aborted populate task");
        }
    }
}

// ============================================================================
// Resource Cleanup
// ============================================================================

/// Abort in-flight tasks so none outlive the event loop.
impl Drop for App {
    fn drop(&mut self) {
        self.abort_search();
        self.abort_populate();
    }
}
