use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use papertree_core::RelevanceTier;

use crate::app::App;
use crate::theme::Theme;
use crate::view::truncate;

/// Render the Paper Detail screen.
pub fn render(f: &mut Frame, app: &App, arxiv_id: &str) {
    let theme = &app.theme;
    let area = f.area();
    let snapshot = app.snapshot();

    let chunks = Layout::vertical([
        Constraint::Length(1), // breadcrumb
        Constraint::Min(5),    // scrollable content
        Constraint::Length(1), // footer
    ])
    .split(area);

    let paper = snapshot.paper(arxiv_id);
    let title = paper.map(|p| p.title.as_str()).unwrap_or(arxiv_id);

    // --- Breadcrumb ---
    let breadcrumb = Line::from(vec![
        Span::styled(" PAPERTREE ", theme.header_style()),
        Span::styled(" > ", Style::default().fg(theme.dim)),
        Span::styled(
            truncate(&snapshot.research_goal, 30),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" > ", Style::default().fg(theme.dim)),
        Span::styled(truncate(title, 50), Style::default().fg(theme.text)),
    ]);
    f.render_widget(Paragraph::new(breadcrumb), chunks[0]);

    // --- Content ---
    let mut lines: Vec<Line> = Vec::new();

    match paper {
        Some(paper) => {
            section_header(&mut lines, "PAPER", theme);
            labeled_line(&mut lines, "Title", &paper.title, theme);
            if !paper.authors.is_empty() {
                labeled_line(&mut lines, "Authors", &paper.authors.join(", "), theme);
            }
            let published = paper
                .published_on()
                .map(|d| d.to_string())
                .unwrap_or_else(|| paper.published_date.clone());
            if !published.is_empty() {
                labeled_line(&mut lines, "Published", &published, theme);
            }
            if !paper.categories.is_empty() {
                let categories: Vec<&str> = paper.categories.iter().map(String::as_str).collect();
                labeled_line(&mut lines, "Categories", &categories.join(", "), theme);
            }
            labeled_line(&mut lines, "arXiv", &paper.arxiv_id, theme);
            if !paper.url.is_empty() {
                labeled_line(&mut lines, "URL", &paper.url, theme);
            }

            lines.push(Line::from(""));
            section_header(&mut lines, "RELEVANCE", theme);
            let tier = RelevanceTier::of(paper.relevance_score);
            let score = paper
                .relevance_score
                .map(|s| format!("{s:.2} ({})", tier.label()))
                .unwrap_or_else(|| "not scored".to_string());
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<16}", "Score"), Style::default().fg(theme.dim)),
                Span::styled(
                    score,
                    Style::default()
                        .fg(theme.tier_color(tier))
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
            if let Some(explanation) = &paper.relevance_explanation {
                labeled_line(&mut lines, "Why", explanation, theme);
            }

            lines.push(Line::from(""));
            section_header(&mut lines, "FOUND BY", theme);
            for node in snapshot.queries_citing(&paper.arxiv_id) {
                lines.push(Line::from(Span::styled(
                    format!("  - {}", node.query),
                    Style::default().fg(theme.query),
                )));
            }

            if !paper.abstract_text.is_empty() {
                lines.push(Line::from(""));
                section_header(&mut lines, "ABSTRACT", theme);
                lines.push(Line::from(Span::styled(
                    format!("  {}", paper.abstract_text.trim()),
                    Style::default().fg(theme.text),
                )));
            }
        }
        None => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "  This paper is no longer part of the tree.",
                Style::default().fg(theme.dim),
            )));
        }
    }

    let content = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style()),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));

    f.render_widget(content, chunks[1]);

    // --- Footer ---
    render_footer(f, chunks[2], theme);
}

fn section_header<'a>(lines: &mut Vec<Line<'a>>, title: &'a str, theme: &Theme) {
    lines.push(Line::from(Span::styled(
        format!("  {title}"),
        Style::default()
            .fg(theme.active)
            .add_modifier(Modifier::BOLD),
    )));
}

fn labeled_line<'a>(lines: &mut Vec<Line<'a>>, label: &'a str, value: &str, theme: &Theme) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {label:<16}"), Style::default().fg(theme.dim)),
        Span::styled(value.to_string(), Style::default().fg(theme.text)),
    ]));
}

fn render_footer(f: &mut Frame, area: Rect, theme: &Theme) {
    let footer = Line::from(Span::styled(
        " j/k:scroll  Esc:back  ?:help  q:quit",
        theme.footer_style(),
    ));
    f.render_widget(Paragraph::new(footer), area);
}
