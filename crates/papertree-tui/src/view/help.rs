use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use papertree_core::RelevanceTier;

use crate::theme::Theme;

const POPUP_WIDTH: u16 = 64;

/// Key bindings, grouped by what they act on.
const BINDINGS: &[(&str, &[(&str, &str)])] = &[
    (
        "Tree",
        &[
            ("j / k", "Next / previous node"),
            ("Ctrl+d / Ctrl+u", "Page through papers"),
            ("g / G", "Research goal / last paper"),
            ("Enter", "Open the paper under the cursor"),
        ],
    ),
    (
        "Search",
        &[
            ("/", "Edit the research question"),
            ("r", "Run the last question again"),
            ("x", "Cancel the running search"),
            ("e / E", "Export Markdown / JSON"),
        ],
    ),
    (
        "Global",
        &[
            ("Esc", "Back, or cancel while searching"),
            ("?", "Toggle this help"),
            ("q / Ctrl+c", "Quit"),
        ],
    ),
];

/// Render the help overlay: key bindings plus a legend for the tree canvas.
pub fn render(f: &mut Frame, theme: &Theme) {
    let mut lines = Vec::new();
    for (title, keys) in BINDINGS {
        lines.push(heading(title, theme));
        for (key, desc) in *keys {
            lines.push(Line::from(vec![
                Span::styled(format!("    {key:<18}"), Style::default().fg(theme.text)),
                Span::styled(*desc, Style::default().fg(theme.dim)),
            ]));
        }
        lines.push(Line::from(""));
    }

    lines.push(heading("Legend", theme));
    lines.push(legend(&[
        ("◆ goal", theme.goal),
        ("○ pending", theme.query),
        ("● done", theme.query),
        ("✗ failed", theme.error),
    ]));
    lines.push(legend(&[
        ("≥0.95 high", theme.tier_color(RelevanceTier::High)),
        ("≥0.85 medium", theme.tier_color(RelevanceTier::Medium)),
        ("lower", theme.tier_color(RelevanceTier::Low)),
        ("-- unscored", theme.tier_color(RelevanceTier::Unscored)),
    ]));
    lines.push(Line::from(vec![
        Span::raw("    "),
        Span::styled("━━", Style::default().fg(theme.edge_highlight)),
        Span::styled(
            " links of the node under the cursor",
            Style::default().fg(theme.dim),
        ),
    ]));

    let height = lines.len() as u16 + 2;
    let popup = popup_area(f.area(), POPUP_WIDTH, height);
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.active))
            .title(Span::styled(" Help ", theme.header_style())),
    );

    f.render_widget(Clear, popup);
    f.render_widget(paragraph, popup);
}

fn heading<'a>(title: &'a str, theme: &Theme) -> Line<'a> {
    Line::from(Span::styled(
        format!("  {title}"),
        Style::default()
            .fg(theme.active)
            .add_modifier(Modifier::BOLD),
    ))
}

fn legend<'a>(entries: &[(&'a str, Color)]) -> Line<'a> {
    let mut spans = vec![Span::raw("    ")];
    for (label, color) in entries {
        spans.push(Span::styled(*label, Style::default().fg(*color)));
        spans.push(Span::raw("   "));
    }
    Line::from(spans)
}

/// Center a `width` x `height` box in `area`, shrinking it to fit.
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
