//! Keybinding registry: maps actions to key events with config overrides.
//!
//! Defaults are registered per context; the `[keybindings]` table in
//! config.toml rebinds an action by name.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    CycleFocus,
    Back,
    Select,
    Expand,
    Collapse,
    EnterSearch,
    ExitSearch,
    CommitSearch,
    Edit,
    CreateChild,
    CreateRoot,
    Delete,
    MarkMove,
    DropMove,
    DropAsRoot,
    MoveUp,
    MoveDown,
    Populate,
    Ask,
    ViewProgress,
    OpenReference,
    Reload,
    ScrollDown,
    ScrollUp,
    PageDown,
    PageUp,
    CycleTheme,
    ShowHelp,
}

impl Action {
    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit application",
            Self::NavDown => "Navigate down",
            Self::NavUp => "Navigate up",
            Self::CycleFocus => "Switch between tree and detail",
            Self::Back => "Go back / dismiss",
            Self::Select => "Select node / toggle children",
            Self::Expand => "Expand node",
            Self::Collapse => "Collapse node / go to parent",
            Self::EnterSearch => "Search nodes",
            Self::ExitSearch => "Leave search",
            Self::CommitSearch => "Run search now",
            Self::Edit => "Edit node",
            Self::CreateChild => "New child node",
            Self::CreateRoot => "New root node",
            Self::Delete => "Delete node",
            Self::MarkMove => "Mark node to move",
            Self::DropMove => "Move marked node here",
            Self::DropAsRoot => "Make marked node a root",
            Self::MoveUp => "Move node up among siblings",
            Self::MoveDown => "Move node down among siblings",
            Self::Populate => "Generate child topics",
            Self::Ask => "Ask a question",
            Self::ViewProgress => "Quiz progress",
            Self::OpenReference => "Open reference link",
            Self::Reload => "Reload",
            Self::ScrollDown => "Scroll down one line",
            Self::ScrollUp => "Scroll up one line",
            Self::PageDown => "Page down",
            Self::PageUp => "Page up",
            Self::CycleTheme => "Cycle theme",
            Self::ShowHelp => "Show help",
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context: determines which bindings are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Tree,
    Detail,
    Search,
    Progress,
}

// ============================================================================
// Key Specification
// ============================================================================

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    const fn char(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Supported formats:
/// - Single char: "q", "j", "/"
/// - Named keys: "Enter", "Esc", "Tab", "Up", "Down", "Backspace"
/// - Modifier combos: "Ctrl+d", "Ctrl+u"
/// - Function keys: "F1" through "F12"
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let mut chars = rest.trim().chars();
        let c = chars.next()?;
        return chars.next().is_none().then_some(KeySpec::ctrl(c));
    }

    // Named keys (case-insensitive)
    match s.to_lowercase().as_str() {
        "enter" | "return" => return Some(KeySpec::plain(KeyCode::Enter)),
        "esc" | "escape" => return Some(KeySpec::plain(KeyCode::Esc)),
        "tab" => return Some(KeySpec::plain(KeyCode::Tab)),
        "up" => return Some(KeySpec::plain(KeyCode::Up)),
        "down" => return Some(KeySpec::plain(KeyCode::Down)),
        "left" => return Some(KeySpec::plain(KeyCode::Left)),
        "right" => return Some(KeySpec::plain(KeyCode::Right)),
        "backspace" => return Some(KeySpec::plain(KeyCode::Backspace)),
        "delete" | "del" => return Some(KeySpec::plain(KeyCode::Delete)),
        "space" => return Some(KeySpec::char(' ')),
        _ => {}
    }

    if let Some(n) = s
        .strip_prefix(['F', 'f'])
        .and_then(|rest| rest.parse::<u8>().ok())
    {
        return (1..=12).contains(&n).then_some(KeySpec::plain(KeyCode::F(n)));
    }

    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(KeySpec::char(c))
}

/// Format a KeySpec as a human-readable string for the help screen.
fn format_key(key: &KeySpec) -> String {
    let modifier = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };

    let key_name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Del".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    format!("{}{}", modifier, key_name)
}

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings, supporting default bindings and config overrides.
///
/// The same key can map to different actions in different contexts; lookups
/// fall back to [`Context::Global`].
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// All bindings in registration order, for the help screen.
    bindings: Vec<(Context, KeySpec, Action)>,
}

/// Default bindings, grouped by context.
const DEFAULT_BINDINGS: &[(Context, KeySpec, Action)] = &[
    // === Global ===
    (Context::Global, KeySpec::char('q'), Action::Quit),
    (Context::Global, KeySpec::char('j'), Action::NavDown),
    (Context::Global, KeySpec::plain(KeyCode::Down), Action::NavDown),
    (Context::Global, KeySpec::char('k'), Action::NavUp),
    (Context::Global, KeySpec::plain(KeyCode::Up), Action::NavUp),
    (Context::Global, KeySpec::plain(KeyCode::Tab), Action::CycleFocus),
    (Context::Global, KeySpec::plain(KeyCode::Esc), Action::Back),
    (Context::Global, KeySpec::plain(KeyCode::Enter), Action::Select),
    (Context::Global, KeySpec::char('/'), Action::EnterSearch),
    (Context::Global, KeySpec::char('r'), Action::Reload),
    (Context::Global, KeySpec::char('a'), Action::Ask),
    (Context::Global, KeySpec::char('P'), Action::ViewProgress),
    (Context::Global, KeySpec::char('o'), Action::OpenReference),
    (Context::Global, KeySpec::char('T'), Action::CycleTheme),
    (Context::Global, KeySpec::char('?'), Action::ShowHelp),
    // === Tree panel ===
    (Context::Tree, KeySpec::char('l'), Action::Expand),
    (Context::Tree, KeySpec::plain(KeyCode::Right), Action::Expand),
    (Context::Tree, KeySpec::char('h'), Action::Collapse),
    (Context::Tree, KeySpec::plain(KeyCode::Left), Action::Collapse),
    (Context::Tree, KeySpec::char('e'), Action::Edit),
    (Context::Tree, KeySpec::char('n'), Action::CreateChild),
    (Context::Tree, KeySpec::char('N'), Action::CreateRoot),
    (Context::Tree, KeySpec::char('d'), Action::Delete),
    (Context::Tree, KeySpec::char('m'), Action::MarkMove),
    (Context::Tree, KeySpec::char('v'), Action::DropMove),
    (Context::Tree, KeySpec::char('V'), Action::DropAsRoot),
    (Context::Tree, KeySpec::char('K'), Action::MoveUp),
    (Context::Tree, KeySpec::char('J'), Action::MoveDown),
    (Context::Tree, KeySpec::char('p'), Action::Populate),
    // === Detail panel ===
    (Context::Detail, KeySpec::char('j'), Action::ScrollDown),
    (Context::Detail, KeySpec::plain(KeyCode::Down), Action::ScrollDown),
    (Context::Detail, KeySpec::char('k'), Action::ScrollUp),
    (Context::Detail, KeySpec::plain(KeyCode::Up), Action::ScrollUp),
    (Context::Detail, KeySpec::ctrl('d'), Action::PageDown),
    (Context::Detail, KeySpec::ctrl('u'), Action::PageUp),
    (Context::Detail, KeySpec::char('e'), Action::Edit),
    (Context::Detail, KeySpec::char('p'), Action::Populate),
    // === Search mode ===
    (Context::Search, KeySpec::plain(KeyCode::Esc), Action::ExitSearch),
    (Context::Search, KeySpec::plain(KeyCode::Enter), Action::CommitSearch),
    // === Progress view ===
    (Context::Progress, KeySpec::char('b'), Action::Back),
    (Context::Progress, KeySpec::char('P'), Action::Back),
];

impl KeybindingRegistry {
    /// Create a registry with the default bindings.
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        for &(context, key, action) in DEFAULT_BINDINGS {
            registry.bind(context, key, action);
        }
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    /// Apply user overrides from the config keybindings map.
    ///
    /// Keys in the map are action names (e.g., "quit", "populate").
    /// Values are key strings (e.g., "q", "Ctrl+d", "F5").
    ///
    /// Returns a list of warnings for unrecognized action names or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        // Sorted so the outcome does not depend on HashMap order
        let mut entries: Vec<(&String, &String)> = overrides.iter().collect();
        entries.sort();

        for (action_name, key_str) in entries {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };

            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            // Re-bind in every context the action was bound in
            let mut contexts: Vec<Context> = self
                .bindings
                .iter()
                .filter(|(_, _, a)| *a == action)
                .map(|(c, _, _)| *c)
                .collect();
            contexts.dedup();

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);

            for ctx in contexts {
                self.bind(ctx, key, action);
            }

            tracing::info!(
                action = %action_name,
                key = %key_str,
                "Applied keybinding override"
            );
        }

        warnings
    }

    /// Look up the action for a given key in a given context.
    ///
    /// Tries the specific context first, then falls back to Global.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        // Shifted letters arrive with SHIFT set on some terminals
        let modifiers = match code {
            KeyCode::Char(_) => modifiers - KeyModifiers::SHIFT,
            _ => modifiers,
        };
        let key = KeySpec::new(code, modifiers);

        if let Some(&action) = self.lookup.get(&(context, key)) {
            return Some(action);
        }

        if context != Context::Global {
            if let Some(&action) = self.lookup.get(&(Context::Global, key)) {
                return Some(action);
            }
        }

        None
    }

    /// First key bound to `action` in `context` (or Global), for hints.
    pub fn key_for(&self, action: Action, context: Context) -> Option<String> {
        self.bindings
            .iter()
            .find(|(c, _, a)| *a == action && *c == context)
            .or_else(|| {
                self.bindings
                    .iter()
                    .find(|(c, _, a)| *a == action && *c == Context::Global)
            })
            .map(|(_, key, _)| format_key(key))
    }

    /// Get all bindings for the help screen.
    ///
    /// Returns (context, key_display_string, action, description) tuples.
    pub fn all_bindings(&self) -> Vec<(Context, String, Action, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), *action, action.describe()))
            .collect()
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an action name string (from config) into an Action enum.
fn parse_action_name(name: &str) -> Option<Action> {
    match name.to_lowercase().as_str() {
        "quit" => Some(Action::Quit),
        "nav_down" | "down" => Some(Action::NavDown),
        "nav_up" | "up" => Some(Action::NavUp),
        "cycle_focus" | "tab" => Some(Action::CycleFocus),
        "back" => Some(Action::Back),
        "select" | "enter" => Some(Action::Select),
        "expand" => Some(Action::Expand),
        "collapse" => Some(Action::Collapse),
        "enter_search" | "search" => Some(Action::EnterSearch),
        "exit_search" => Some(Action::ExitSearch),
        "commit_search" => Some(Action::CommitSearch),
        "edit" => Some(Action::Edit),
        "create_child" | "create" | "new" => Some(Action::CreateChild),
        "create_root" | "new_root" => Some(Action::CreateRoot),
        "delete" | "remove" => Some(Action::Delete),
        "mark_move" | "mark" => Some(Action::MarkMove),
        "drop_move" | "drop" => Some(Action::DropMove),
        "drop_as_root" => Some(Action::DropAsRoot),
        "move_up" => Some(Action::MoveUp),
        "move_down" => Some(Action::MoveDown),
        "populate" | "generate" => Some(Action::Populate),
        "ask" => Some(Action::Ask),
        "view_progress" | "progress" => Some(Action::ViewProgress),
        "open_reference" | "open" => Some(Action::OpenReference),
        "reload" | "refresh" => Some(Action::Reload),
        "scroll_down" => Some(Action::ScrollDown),
        "scroll_up" => Some(Action::ScrollUp),
        "page_down" => Some(Action::PageDown),
        "page_up" => Some(Action::PageUp),
        "cycle_theme" | "theme" => Some(Action::CycleTheme),
        "show_help" | "help" => Some(Action::ShowHelp),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
