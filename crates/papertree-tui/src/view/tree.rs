use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Context, Line as CanvasLine};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use papertree_core::{Connection, GraphSnapshot, NodeId, QueryStatus, RelevanceTier};

use crate::app::App;
use crate::theme::Theme;
use crate::view::{spinner_char, truncate};

/// Samples per drawn curve.
const CURVE_SEGMENTS: usize = 16;

/// Render the tree screen.
pub fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::vertical([
        Constraint::Length(1), // header
        Constraint::Length(1), // query prompt
        Constraint::Min(3),    // canvas
        Constraint::Length(1), // footer / status
    ])
    .split(area);

    let snapshot = app.snapshot();
    render_header(f, chunks[0], app, &snapshot);
    render_prompt(f, chunks[1], app);
    render_canvas(f, chunks[2], app, &snapshot);
    render_footer(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App, snapshot: &GraphSnapshot) {
    let theme = &app.theme;
    let progress = app.engine.progress();

    let mut spans = vec![
        Span::styled(" PAPERTREE ", theme.header_style()),
        Span::raw(" "),
    ];
    if progress.phase.is_active() {
        spans.push(Span::styled(
            format!("{} ", spinner_char(app.tick)),
            Style::default().fg(theme.spinner),
        ));
    }
    spans.push(Span::styled(
        progress.phase.label(),
        Style::default()
            .fg(theme.phase_color(progress.phase))
            .add_modifier(Modifier::BOLD),
    ));
    if progress.total > 0 {
        spans.push(Span::styled(
            format!(
                "  {}/{} queries  {} papers",
                progress.current, progress.total, snapshot.total_unique_papers
            ),
            Style::default().fg(theme.text),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_prompt(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let line = if app.editing {
        Line::from(vec![
            Span::styled(" Query: ", Style::default().fg(theme.active).add_modifier(Modifier::BOLD)),
            Span::styled(app.input.clone(), Style::default().fg(theme.text)),
            Span::styled("▏", Style::default().fg(theme.active)),
        ])
    } else {
        let query = app.last_query.as_deref().unwrap_or_default();
        Line::from(vec![
            Span::styled(" Query: ", Style::default().fg(theme.dim)),
            Span::styled(
                truncate(query, (area.width as usize).saturating_sub(9)),
                Style::default().fg(theme.text),
            ),
        ])
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_canvas(f: &mut Frame, area: Rect, app: &App, snapshot: &GraphSnapshot) {
    let theme = &app.theme;
    let title = if snapshot.research_goal.is_empty() {
        " Research tree ".to_string()
    } else {
        format!(
            " {} ",
            truncate(&snapshot.research_goal, (area.width as usize).saturating_sub(4))
        )
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(title);

    if snapshot.is_empty() {
        let message = if app.searching {
            format!(" {} Generating queries...", spinner_char(app.tick))
        } else {
            " Type a research question and press Enter.".to_string()
        };
        let placeholder = Paragraph::new(Line::from(Span::styled(
            message,
            Style::default().fg(theme.dim),
        )))
        .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let width = app.layout.width;
    let height = app.layout.height;
    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            let connections = app.engine.last_connections();
            // Emphasized edges last so they sit on top.
            for connection in connections.iter().filter(|c| !app.highlight.has_edge(&c.id)) {
                draw_curve(ctx, connection, height, theme.edge);
            }
            for connection in connections.iter().filter(|c| app.highlight.has_edge(&c.id)) {
                draw_curve(ctx, connection, height, theme.edge_highlight);
            }
            ctx.layer();

            for (index, node) in app.layout.order.iter().enumerate() {
                let Some(rect) = app.layout.rects.get(node) else {
                    continue;
                };
                let Some((text, fg, dimmed)) = node_label(snapshot, node, theme) else {
                    continue;
                };
                let mut style = theme.node_style(fg, app.highlight.has_node(node), dimmed);
                if index == app.cursor {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                let text = truncate(&text, rect.width as usize);
                ctx.print(rect.x, height - rect.center().y, Span::styled(text, style));
            }
        });
    f.render_widget(canvas, area);
}

fn draw_curve(ctx: &mut Context, connection: &Connection, height: f64, color: Color) {
    let points = connection.polyline(CURVE_SEGMENTS);
    for pair in points.windows(2) {
        ctx.draw(&CanvasLine {
            x1: pair[0].x,
            y1: height - pair[0].y,
            x2: pair[1].x,
            y2: height - pair[1].y,
            color,
        });
    }
}

/// Label text, color, and whether the node is still waiting for data.
fn node_label(
    snapshot: &GraphSnapshot,
    node: &NodeId,
    theme: &Theme,
) -> Option<(String, Color, bool)> {
    match node {
        NodeId::Goal => Some((format!("◆ {}", snapshot.research_goal), theme.goal, false)),
        NodeId::Query(slot) => {
            let query = snapshot.query(*slot)?;
            let marker = match query.status {
                QueryStatus::Pending | QueryStatus::Searching => "○",
                QueryStatus::Done => "●",
                QueryStatus::Error => "✗",
            };
            Some((
                format!("{marker} {} ({})", query.query, query.paper_count()),
                theme.status_color(query.status),
                query.status == QueryStatus::Pending,
            ))
        }
        NodeId::Paper(id) => {
            let paper = snapshot.paper(id)?;
            let score = paper
                .relevance_score
                .map(|s| format!("{s:.2}"))
                .unwrap_or_else(|| " -- ".to_string());
            Some((
                format!("{score} {}", paper.title),
                theme.tier_color(RelevanceTier::of(paper.relevance_score)),
                false,
            ))
        }
    }
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let line = match &app.status_message {
        Some(message) => Line::from(Span::styled(
            format!(" {message}"),
            Style::default().fg(theme.medium),
        )),
        None if app.editing => Line::from(Span::styled(
            " Enter:search  Esc:close prompt  Ctrl+c:quit",
            theme.footer_style(),
        )),
        None => Line::from(Span::styled(
            " j/k:move  Enter:open paper  /:new query  r:retry  x:cancel  e/E:export  ?:help  q:quit",
            theme.footer_style(),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}
