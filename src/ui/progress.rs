//! Quiz progress view: one row per topic, most recent first.

use crate::app::{App, ProgressState};
use crate::progress::{format_trend, TopicProgress};
use crate::util::single_line;
use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::Style,
    widgets::{Block, Borders, Paragraph, Row, Table, TableState},
    Frame,
};

/// Render the progress view into `area`.
pub(super) fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 20 || area.height < 5 {
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border_focused"))
        .title(" Quiz Progress ");

    let summaries = match &app.progress {
        None | Some(ProgressState::Loading) => {
            render_message(f, app, area, block, "Loading quiz history...");
            return;
        }
        Some(ProgressState::Failed(error)) => {
            let msg = format!("Could not load quiz history:\n{}\n\nPress r to retry.", error);
            render_message(f, app, area, block, &msg);
            return;
        }
        Some(ProgressState::Loaded(summaries)) if summaries.is_empty() => {
            render_message(
                f,
                app,
                area,
                block,
                "No quiz history yet.\n\nRun `knowtree quiz <topic>` to take your first quiz.",
            );
            return;
        }
        Some(ProgressState::Loaded(summaries)) => summaries,
    };

    let header = Row::new(vec!["Topic", "Attempts", "Best", "Latest", "Average", "Trend", "Last attempt"])
        .style(app.style("progress_header"))
        .bottom_margin(1);

    let rows: Vec<Row> = summaries.iter().map(|s| summary_row(app, s)).collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(17),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(app.style("tree_selected"))
        .style(app.style("detail_body"));

    let mut state = TableState::default().with_selected(Some(app.progress_selected));
    f.render_stateful_widget(table, area, &mut state);
}

fn summary_row<'a>(app: &App, s: &TopicProgress) -> Row<'a> {
    let trend_style = match s.trend {
        Some(t) if t > 0.0 => app.style("progress_up"),
        Some(t) if t < 0.0 => app.style("progress_down"),
        _ => Style::default(),
    };
    Row::new(vec![
        ratatui::text::Text::from(single_line(&s.topic)),
        s.attempts.to_string().into(),
        format!("{:.1}", s.best).into(),
        format!("{:.1}", s.latest).into(),
        format!("{:.1}", s.average).into(),
        ratatui::text::Text::styled(format_trend(s.trend), trend_style),
        s.last_attempt.format("%Y-%m-%d %H:%M").to_string().into(),
    ])
}

fn render_message(f: &mut Frame, app: &App, area: Rect, block: Block<'_>, msg: &str) {
    let paragraph = Paragraph::new(msg.to_string())
        .block(block)
        .alignment(Alignment::Center)
        .style(app.style("detail_body"));
    f.render_widget(paragraph, area);
}
