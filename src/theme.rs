//! Theme system for the TUI.
//!
//! Provides semantic color roles that map to ratatui `Style` values.
//! The `ThemeVariant` enum selects between Dark and Light palettes,
//! and `StyleMap` resolves role names to concrete styles. Root categories
//! get their own accent color through [`category_style`].

use ratatui::style::{Color, Modifier, Style};
use std::borrow::Cow;
use std::collections::HashMap;

// ============================================================================
// Theme Variant
// ============================================================================

/// Available theme variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeVariant {
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name from a string (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    /// Build the `ColorPalette` for this variant.
    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    /// Cycle to the next variant: Dark → Light → Dark.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// Human-readable name for status display.
    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }
}

// ============================================================================
// Color Palette: semantic roles to Style
// ============================================================================

/// A complete color palette mapping every semantic UI role to a `Style`.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    // -- Tree panel --
    pub tree_normal: Style,
    pub tree_selected: Style,
    pub tree_loading: Style,
    pub tree_marked: Style,
    pub tree_search_hit: Style,

    // -- Detail panel --
    pub detail_heading: Style,
    pub detail_label: Style,
    pub detail_body: Style,
    pub detail_breadcrumb: Style,
    pub detail_code_block: Style,
    pub detail_inline_code: Style,
    pub detail_emphasis: Style,
    pub detail_strong: Style,
    pub detail_link: Style,
    pub detail_muted: Style,

    // -- Chrome --
    pub status_bar: Style,
    pub panel_border: Style,
    pub panel_border_focused: Style,
    pub dialog_border: Style,
    pub dialog_input: Style,

    // -- Progress view --
    pub progress_header: Style,
    pub progress_up: Style,
    pub progress_down: Style,
}

impl ColorPalette {
    fn dark() -> Self {
        Self {
            // Tree
            tree_normal: Style::default(),
            tree_selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            tree_loading: Style::default().fg(Color::DarkGray),
            tree_marked: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            tree_search_hit: Style::default().fg(Color::Yellow),

            // Detail
            detail_heading: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            detail_label: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::UNDERLINED),
            detail_body: Style::default(),
            detail_breadcrumb: Style::default().fg(Color::DarkGray),
            detail_code_block: Style::default().fg(Color::Yellow).bg(Color::Black),
            detail_inline_code: Style::default().fg(Color::Yellow),
            detail_emphasis: Style::default().add_modifier(Modifier::ITALIC),
            detail_strong: Style::default().add_modifier(Modifier::BOLD),
            detail_link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            detail_muted: Style::default().fg(Color::DarkGray),

            // Chrome
            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            panel_border: Style::default(),
            panel_border_focused: Style::default().fg(Color::Cyan),
            dialog_border: Style::default().fg(Color::Yellow),
            dialog_input: Style::default().fg(Color::White).bg(Color::Black),

            // Progress
            progress_header: Style::default().add_modifier(Modifier::BOLD),
            progress_up: Style::default().fg(Color::Green),
            progress_down: Style::default().fg(Color::Red),
        }
    }

    fn light() -> Self {
        Self {
            // Tree
            tree_normal: Style::default().fg(Color::Black),
            tree_selected: Style::default().bg(Color::Blue).fg(Color::White),
            tree_loading: Style::default().fg(Color::DarkGray),
            tree_marked: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            tree_search_hit: Style::default().fg(Color::Magenta),

            // Detail
            detail_heading: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            detail_label: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            detail_body: Style::default().fg(Color::Black),
            detail_breadcrumb: Style::default().fg(Color::DarkGray),
            detail_code_block: Style::default().fg(Color::DarkGray).bg(Color::White),
            detail_inline_code: Style::default().fg(Color::DarkGray),
            detail_emphasis: Style::default().add_modifier(Modifier::ITALIC),
            detail_strong: Style::default().add_modifier(Modifier::BOLD),
            detail_link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            detail_muted: Style::default().fg(Color::DarkGray),

            // Chrome
            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            panel_border: Style::default().fg(Color::DarkGray),
            panel_border_focused: Style::default().fg(Color::Blue),
            dialog_border: Style::default().fg(Color::Magenta),
            dialog_input: Style::default().fg(Color::Black).bg(Color::Gray),

            // Progress
            progress_header: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            progress_up: Style::default().fg(Color::Green),
            progress_down: Style::default().fg(Color::Red),
        }
    }
}

// ============================================================================
// Style Map: string-keyed lookup
// ============================================================================

/// String-keyed style lookup, built from a `ColorPalette`.
#[derive(Debug, Clone)]
pub struct StyleMap {
    map: HashMap<&'static str, Style>,
}

/// All semantic role names, in declaration order.
const ROLE_NAMES: [&str; 23] = [
    "tree_normal",
    "tree_selected",
    "tree_loading",
    "tree_marked",
    "tree_search_hit",
    "detail_heading",
    "detail_label",
    "detail_body",
    "detail_breadcrumb",
    "detail_code_block",
    "detail_inline_code",
    "detail_emphasis",
    "detail_strong",
    "detail_link",
    "detail_muted",
    "status_bar",
    "panel_border",
    "panel_border_focused",
    "dialog_border",
    "dialog_input",
    "progress_header",
    "progress_up",
    "progress_down",
];

impl StyleMap {
    pub fn from_palette(p: &ColorPalette) -> Self {
        let styles: [Style; 23] = [
            p.tree_normal,
            p.tree_selected,
            p.tree_loading,
            p.tree_marked,
            p.tree_search_hit,
            p.detail_heading,
            p.detail_label,
            p.detail_body,
            p.detail_breadcrumb,
            p.detail_code_block,
            p.detail_inline_code,
            p.detail_emphasis,
            p.detail_strong,
            p.detail_link,
            p.detail_muted,
            p.status_bar,
            p.panel_border,
            p.panel_border_focused,
            p.dialog_border,
            p.dialog_input,
            p.progress_header,
            p.progress_up,
            p.progress_down,
        ];

        let map = ROLE_NAMES.iter().copied().zip(styles).collect();
        Self { map }
    }

    /// Resolve a role name to its `Style`. Returns `Style::default()` for unknown roles.
    pub fn resolve(&self, role: &str) -> Style {
        self.map.get(role).copied().unwrap_or_default()
    }
}

// ============================================================================
// Category colors
// ============================================================================

/// Accent color and short badge for a root category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStyle {
    pub color: Color,
    pub label: Cow<'static, str>,
}

const KNOWN_CATEGORIES: &[(&str, Color, &str)] = &[
    ("computer science", Color::Cyan, "CS"),
    ("mathematics", Color::Yellow, "MATH"),
    ("physics", Color::LightBlue, "PHYS"),
    ("chemistry", Color::LightGreen, "CHEM"),
    ("biology", Color::Green, "BIO"),
    ("physical fitness", Color::LightRed, "FIT"),
    ("history", Color::LightYellow, "HIST"),
    ("languages", Color::LightMagenta, "LANG"),
    ("music", Color::Magenta, "MUS"),
    ("economics", Color::LightCyan, "ECON"),
];

const FALLBACK_COLORS: [Color; 6] = [
    Color::Blue,
    Color::Green,
    Color::Magenta,
    Color::Red,
    Color::Cyan,
    Color::Yellow,
];

/// Look up the style for a root category by name (case-insensitive).
///
/// Unknown names get a color picked from a fixed palette by a hash of the
/// name, and a label made of up to three initials.
pub fn category_style(root_name: &str) -> CategoryStyle {
    let key = root_name.trim().to_lowercase();
    if let Some(&(_, color, label)) = KNOWN_CATEGORIES.iter().find(|(name, _, _)| *name == key) {
        return CategoryStyle {
            color,
            label: Cow::Borrowed(label),
        };
    }

    // FNV-1a: stable across runs, unlike the std hasher
    let hash = key.bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    let color = FALLBACK_COLORS[(hash % FALLBACK_COLORS.len() as u64) as usize];

    let initials: String = key
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(3)
        .flat_map(char::to_uppercase)
        .collect();

    CategoryStyle {
        color,
        label: Cow::Owned(initials),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_palette_selection_and_focus() {
        let palette = ThemeVariant::Dark.palette();
        assert_eq!(
            palette.tree_selected,
            Style::default().bg(Color::DarkGray).fg(Color::White)
        );
        assert_eq!(
            palette.panel_border_focused,
            Style::default().fg(Color::Cyan)
        );
    }

    #[test]
    fn light_palette_differs_from_dark() {
        let dark = ThemeVariant::Dark.palette();
        let light = ThemeVariant::Light.palette();
        assert_ne!(dark.tree_selected, light.tree_selected);
        assert_ne!(dark.status_bar, light.status_bar);
    }

    #[test]
    fn variant_from_str_name() {
        assert_eq!(
            ThemeVariant::from_str_name("dark"),
            Some(ThemeVariant::Dark)
        );
        assert_eq!(
            ThemeVariant::from_str_name("Light"),
            Some(ThemeVariant::Light)
        );
        assert_eq!(ThemeVariant::from_str_name("neon"), None);
        assert_eq!(ThemeVariant::Dark.next(), ThemeVariant::Light);
    }

    #[test]
    fn style_map_resolves_known_roles() {
        let palette = ThemeVariant::Dark.palette();
        let sm = StyleMap::from_palette(&palette);

        assert_eq!(sm.resolve("tree_selected"), palette.tree_selected);
        assert_eq!(sm.resolve("detail_heading"), palette.detail_heading);
        assert_eq!(sm.resolve("nonexistent_role"), Style::default());
    }

    #[test]
    fn role_names_count_matches_palette_fields() {
        let palette = ThemeVariant::Dark.palette();
        let sm = StyleMap::from_palette(&palette);
        assert_eq!(sm.map.len(), ROLE_NAMES.len());
    }

    #[test]
    fn known_categories_use_table() {
        let cs = category_style("Computer Science");
        assert_eq!(cs.color, Color::Cyan);
        assert_eq!(cs.label, "CS");
        assert_eq!(category_style("  physical FITNESS ").label, "FIT");
    }

    #[test]
    fn unknown_categories_are_deterministic() {
        let a = category_style("Culinary Arts");
        let b = category_style("culinary arts");
        assert_eq!(a, b);
        assert_eq!(a.label, "CA");
        assert!(FALLBACK_COLORS.contains(&a.color));
        assert_eq!(category_style("").label, "");
    }
}
