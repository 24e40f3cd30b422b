use ratatui::style::{Color, Modifier, Style};

use papertree_core::{QueryStatus, RelevanceTier, SearchPhase};

/// Color theme for the TUI.
pub struct Theme {
    pub goal: Color,
    pub query: Color,
    pub high: Color,
    pub medium: Color,
    pub low: Color,
    pub error: Color,

    pub edge: Color,
    pub edge_highlight: Color,

    pub header_fg: Color,
    pub header_bg: Color,
    pub border: Color,
    pub text: Color,
    pub dim: Color,
    pub highlight_bg: Color,
    pub active: Color,
    pub spinner: Color,
    pub footer_fg: Color,
    pub footer_bg: Color,
}

impl Theme {
    /// Green-on-dark terminal theme.
    pub fn dark() -> Self {
        Self {
            goal: Color::Magenta,
            query: Color::Cyan,
            high: Color::Green,
            medium: Color::Yellow,
            low: Color::Gray,
            error: Color::Red,

            edge: Color::DarkGray,
            edge_highlight: Color::LightGreen,

            header_fg: Color::Black,
            header_bg: Color::Green,
            border: Color::DarkGray,
            text: Color::White,
            dim: Color::DarkGray,
            highlight_bg: Color::Rgb(30, 50, 30),
            active: Color::Cyan,
            spinner: Color::Cyan,
            footer_fg: Color::DarkGray,
            footer_bg: Color::Reset,
        }
    }

    pub fn status_color(&self, status: QueryStatus) -> Color {
        match status {
            QueryStatus::Pending => self.dim,
            QueryStatus::Searching => self.active,
            QueryStatus::Done => self.query,
            QueryStatus::Error => self.error,
        }
    }

    pub fn tier_color(&self, tier: RelevanceTier) -> Color {
        match tier {
            RelevanceTier::High => self.high,
            RelevanceTier::Medium => self.medium,
            RelevanceTier::Low | RelevanceTier::Unscored => self.low,
        }
    }

    pub fn phase_color(&self, phase: SearchPhase) -> Color {
        match phase {
            SearchPhase::Idle => self.dim,
            SearchPhase::Generating | SearchPhase::Searching => self.active,
            SearchPhase::Done => self.high,
        }
    }

    /// Style for a node label; emphasized nodes are bold on the highlight background.
    pub fn node_style(&self, fg: Color, emphasized: bool, dimmed: bool) -> Style {
        let style = Style::default().fg(if dimmed { self.dim } else { fg });
        if emphasized {
            style.bg(self.highlight_bg).add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    pub fn header_style(&self) -> Style {
        Style::default().fg(self.header_fg).bg(self.header_bg).add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn footer_style(&self) -> Style {
        Style::default().fg(self.footer_fg).bg(self.footer_bg)
    }
}
