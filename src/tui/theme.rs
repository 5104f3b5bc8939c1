use ratatui::style::{Color, Modifier, Style};

const HOT_SHARE_LOW: f64 = 10.0;
const HOT_SHARE_HIGH: f64 = 50.0;

/// Dashboard styling. With `no_color` set (or `NO_COLOR` in the
/// environment) only bold and reverse-video are used.
pub struct Theme {
    pub no_color: bool,
}

impl Theme {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    /// Color for a user's or client's share of window traffic, in percent.
    /// Green under 10%, red over half, yellow in between.
    pub fn share_color(&self, pct: f64) -> Color {
        match pct {
            _ if self.no_color => Color::Reset,
            p if p < HOT_SHARE_LOW => Color::Green,
            p if p <= HOT_SHARE_HIGH => Color::Yellow,
            _ => Color::Red,
        }
    }

    pub fn header_style(&self) -> Style {
        if self.no_color {
            return Style::default().add_modifier(Modifier::BOLD);
        }
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }

    /// Highlighted row.
    pub fn selected_style(&self) -> Style {
        if self.no_color {
            return Style::default().add_modifier(Modifier::REVERSED);
        }
        Style::default()
            .bg(Color::DarkGray)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_style(&self, active: bool) -> Style {
        match (active, self.no_color) {
            (true, true) => Style::default().add_modifier(Modifier::BOLD),
            (true, false) => Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            (false, true) => Style::default(),
            (false, false) => Style::default().fg(Color::DarkGray),
        }
    }
}
