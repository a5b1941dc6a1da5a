use crate::api::Node;
use crate::app::{App, Focus};
use crate::theme::StyleMap;
use crate::util::{single_line, strip_control_chars};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use ratatui::{
    layout::Rect,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

const BREADCRUMB_SEPARATOR: &str = " > ";

/// Render the detail panel for the selected node.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    app.detail_visible_lines = area.height.saturating_sub(2) as usize;

    let border_style = if app.focus == Focus::Detail {
        app.style("panel_border_focused")
    } else {
        app.style("panel_border")
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title("Details");

    let Some(node) = app.current_node() else {
        let paragraph = Paragraph::new("Select a topic to see its details")
            .style(app.style("detail_muted"))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let crumbs = app.model.state().breadcrumbs(&node);
    let lines = detail_lines(&node, &crumbs, &app.theme);

    // Clamp before rendering so a resize never shows an empty frame
    let width = area.width.saturating_sub(2).max(1) as usize;
    let content_lines: usize = lines.iter().map(|l| wrapped_line_count(l, width)).sum();
    app.clamp_scroll(content_lines);

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset as u16, 0));
    f.render_widget(paragraph, area);
}

/// Build the panel body: breadcrumbs, name, description, then each text
/// section that has content.
pub fn detail_lines(node: &Node, crumbs: &[Node], theme: &StyleMap) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let path = crumbs
        .iter()
        .map(|n| single_line(&n.name))
        .collect::<Vec<_>>()
        .join(BREADCRUMB_SEPARATOR);
    lines.push(Line::from(Span::styled(path, theme.resolve("detail_breadcrumb"))));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        single_line(&node.name),
        theme.resolve("detail_heading"),
    )));

    if let Some(description) = non_blank(node.description.as_deref()) {
        lines.push(Line::from(Span::styled(
            strip_control_chars(description).into_owned(),
            theme.resolve("detail_emphasis"),
        )));
    }
    lines.push(Line::from(""));

    if let Some(content) = non_blank(node.content.as_deref()) {
        push_label(&mut lines, "Content", theme);
        lines.extend(render_markdown(&strip_control_chars(content), theme));
    }

    if let Some(examples) = non_blank(node.examples.as_deref()) {
        push_label(&mut lines, "Examples", theme);
        let style = theme.resolve("detail_code_block");
        lines.extend(
            strip_control_chars(examples)
                .lines()
                .map(|l| Line::from(Span::styled(l.to_string(), style))),
        );
        lines.push(Line::from(""));
    }

    if let Some(references) = non_blank(node.references.as_deref()) {
        push_label(&mut lines, "References", theme);
        let link = theme.resolve("detail_link");
        let body = theme.resolve("detail_body");
        for line in strip_control_chars(references).lines() {
            let style = if line.contains("://") { link } else { body };
            lines.push(Line::from(Span::styled(line.to_string(), style)));
        }
    }

    if lines.len() <= 4 && node.has_children() {
        lines.push(Line::from(Span::styled(
            "No content yet. Press p to generate subtopics.",
            theme.resolve("detail_muted"),
        )));
    }

    lines
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

fn push_label(lines: &mut Vec<Line<'static>>, label: &'static str, theme: &StyleMap) {
    lines.push(Line::from(Span::styled(label, theme.resolve("detail_label"))));
}

/// How many display lines a line occupies after wrapping.
fn wrapped_line_count(line: &Line<'_>, width: usize) -> usize {
    let line_width: usize = line.spans.iter().map(|s| s.content.width()).sum();
    line_width.max(1).div_ceil(width.max(1))
}

/// Convert markdown to styled ratatui Lines.
pub fn render_markdown(md: &str, theme: &StyleMap) -> Vec<Line<'static>> {
    let parser = Parser::new(md);
    let mut lines: Vec<Line<'static>> = Vec::with_capacity(md.lines().count());
    let mut current_spans: Vec<Span<'static>> = Vec::with_capacity(4);
    let mut in_code_block = false;
    let mut in_heading = false;
    let mut in_emphasis = false;
    let mut in_strong = false;
    let mut list_depth: usize = 0;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                in_heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
                in_heading = false;
            }
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
                if list_depth == 0 {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::List(_)) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
                list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::Item) => {
                current_spans.push(Span::raw(format!(
                    "{}- ",
                    "  ".repeat(list_depth.saturating_sub(1))
                )));
            }
            Event::End(TagEnd::Item) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                lines.push(Line::from(""));
            }
            Event::Start(Tag::Emphasis) => {
                in_emphasis = true;
            }
            Event::End(TagEnd::Emphasis) => {
                in_emphasis = false;
            }
            Event::Start(Tag::Strong) => {
                in_strong = true;
            }
            Event::End(TagEnd::Strong) => {
                in_strong = false;
            }
            Event::End(TagEnd::Link) => {}
            Event::Start(Tag::Image { dest_url, .. }) => {
                current_spans.push(Span::styled(
                    format!("[Image: {}]", dest_url),
                    theme.resolve("detail_link"),
                ));
            }
            Event::Text(text) => {
                if in_code_block {
                    // Code text can span several lines
                    let style = theme.resolve("detail_code_block");
                    lines.extend(
                        text.lines()
                            .map(|l| Line::from(Span::styled(l.to_string(), style))),
                    );
                    continue;
                }
                let style = if in_heading {
                    theme.resolve("detail_heading")
                } else if in_strong {
                    theme.resolve("detail_strong")
                } else if in_emphasis {
                    theme.resolve("detail_emphasis")
                } else {
                    theme.resolve("detail_body")
                };
                current_spans.push(Span::styled(text.into_string(), style));
            }
            Event::Code(code) => {
                current_spans.push(Span::styled(
                    format!("`{}`", code),
                    theme.resolve("detail_inline_code"),
                ));
            }
            Event::SoftBreak => {
                current_spans.push(Span::raw(" "));
            }
            Event::HardBreak => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
            }
            _ => {}
        }
    }

    if !current_spans.is_empty() {
        lines.push(Line::from(current_spans));
    }

    lines
}
