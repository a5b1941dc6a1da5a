use crate::app::{App, Focus};
use crate::theme::category_style;
use crate::util::strip_control_chars;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::collections::HashSet;

/// Render the tree panel.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let border_style = if app.focus == Focus::Tree {
        app.style("panel_border_focused")
    } else {
        app.style("panel_border")
    };
    let hits = app.model.state().search_results.len();
    let title = if hits > 0 {
        format!("Knowledge Tree ({} matches)", hits)
    } else {
        "Knowledge Tree".to_string()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);

    let rows = app.rows();
    if rows.is_empty() {
        let paragraph = Paragraph::new("No topics loaded. Press r to reload.")
            .style(app.style("tree_loading"))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let search_hits: HashSet<_> = app
        .model
        .state()
        .search_results
        .iter()
        .map(|n| n.id)
        .collect();

    let style_selected = app.style("tree_selected");
    let style_normal = app.style("tree_normal");
    let style_marked = app.style("tree_marked");
    let style_hit = app.style("tree_search_hit");
    let style_loading = app.style("tree_loading");

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let indent = "  ".repeat(row.depth);
            let icon = if row.is_loading {
                "~ "
            } else if row.has_children {
                if row.is_expanded {
                    "v "
                } else {
                    "> "
                }
            } else {
                "  "
            };

            let category = category_style(&row.root_name);
            let style = if i == app.selected_row {
                style_selected
            } else if app.move_mark == Some(row.id) {
                style_marked
            } else if search_hits.contains(&row.id) {
                style_hit
            } else if row.depth == 0 {
                style_normal.fg(category.color).add_modifier(Modifier::BOLD)
            } else {
                style_normal
            };

            let mut spans = Vec::with_capacity(4);
            spans.push(Span::styled(
                format!("{}{}", indent, icon),
                Style::default().fg(category.color),
            ));
            spans.push(Span::styled(strip_control_chars(&row.name).into_owned(), style));
            if row.depth == 0 && !category.label.is_empty() {
                spans.push(Span::styled(
                    format!(" [{}]", category.label),
                    Style::default().fg(category.color),
                ));
            }
            if row.is_loading {
                spans.push(Span::styled(" loading...", style_loading));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default());

    let mut state = ListState::default().with_selected(Some(app.selected_row));
    f.render_stateful_widget(list, area, &mut state);
}
