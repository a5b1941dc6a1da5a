//! Help overlay: scrollable keybinding table.
//!
//! Shows the live bindings (config overrides included), grouped by the
//! panel they apply to.

use crate::app::App;
use crate::keybindings::{Context, KeybindingRegistry};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table},
    Frame,
};

/// Context display order and labels for the help screen.
const CONTEXT_ORDER: [(Context, &str); 5] = [
    (Context::Global, "General"),
    (Context::Tree, "Tree panel"),
    (Context::Detail, "Details panel"),
    (Context::Search, "Search"),
    (Context::Progress, "Progress view"),
];

/// One labelled group of (key, description) pairs.
type Section = (&'static str, Vec<(String, &'static str)>);

/// Bindings grouped by context, in display order. Empty groups are skipped.
fn sections(registry: &KeybindingRegistry) -> Vec<Section> {
    let bindings = registry.all_bindings();
    CONTEXT_ORDER
        .iter()
        .map(|(ctx, label)| {
            let entries = bindings
                .iter()
                .filter(|(c, _, _, _)| c == ctx)
                .map(|(_, key, _, description)| (key.clone(), *description))
                .collect::<Vec<_>>();
            (*label, entries)
        })
        .filter(|(_, entries)| !entries.is_empty())
        .collect()
}

/// Render the help overlay on top of the current view.
pub fn render(f: &mut Frame, app: &App) {
    let overlay = centered_rect(80, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }
    f.render_widget(Clear, overlay);

    let mut rows: Vec<Row> = Vec::new();
    for (label, entries) in sections(&app.keybindings) {
        if !rows.is_empty() {
            rows.push(Row::new(vec![String::new(), String::new()]));
        }
        rows.push(
            Row::new(vec![
                Line::from(Span::styled(
                    format!("-- {} --", label),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ])
            .style(app.style("detail_heading")),
        );
        rows.extend(
            entries
                .into_iter()
                .map(|(key, description)| Row::new(vec![format!("  {}", key), description.to_string()])),
        );
    }

    let total_rows = rows.len();
    let visible_height = overlay.height.saturating_sub(3) as usize; // borders + header
    let max_scroll = total_rows.saturating_sub(visible_height);
    let scroll = app.help_scroll_offset.min(max_scroll);
    let visible_rows: Vec<Row> = rows.into_iter().skip(scroll).take(visible_height).collect();

    let title = if max_scroll > 0 {
        format!(" Help ({}/{}) ", scroll + 1, max_scroll + 1)
    } else {
        " Help (? to close) ".to_string()
    };

    let table = Table::new(visible_rows, [Constraint::Length(16), Constraint::Min(20)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(title),
        )
        .header(
            Row::new(vec!["Key", "Action"])
                .style(
                    Style::default()
                        .add_modifier(Modifier::BOLD)
                        .add_modifier(Modifier::UNDERLINED),
                )
                .bottom_margin(1),
        )
        .style(app.style("detail_body"));
    f.render_widget(table, overlay);

    if scroll < max_scroll {
        let hint = Line::from(Span::styled(
            " j/k to scroll, ? or Esc to close ",
            app.style("detail_muted"),
        ));
        let hint_area = Rect {
            x: overlay.x + 1,
            y: overlay.y + overlay.height.saturating_sub(1),
            width: overlay.width.saturating_sub(2),
            height: 1,
        };
        f.render_widget(Paragraph::new(hint), hint_area);
    }
}

/// Create a centered rectangle with the given percentage of the parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_sections_follow_context_order() {
        let labels: Vec<&str> = sections(&KeybindingRegistry::new())
            .iter()
            .map(|(label, _)| *label)
            .collect();
        assert_eq!(
            labels,
            vec!["General", "Tree panel", "Details panel", "Search", "Progress view"]
        );
    }

    #[test]
    fn test_sections_show_overrides() {
        let mut registry = KeybindingRegistry::new();
        registry.apply_overrides(&HashMap::from([("ask".to_string(), "F2".to_string())]));
        let general = &sections(&registry)[0].1;
        assert!(general.contains(&("F2".to_string(), "Ask a question")));
        assert!(!general.iter().any(|(key, _)| key == "a"));
    }

    #[test]
    fn test_centered_rect() {
        let rect = centered_rect(50, 50, Rect::new(0, 0, 100, 40));
        assert_eq!(rect, Rect::new(25, 10, 50, 20));
    }
}
