use ratatui::style::{Color, Modifier, Style};

pub struct OverlayStyles {
    pub text: Style,
    pub border: Style,
    pub hint: Style,
}

impl Default for OverlayStyles {
    fn default() -> Self {
        Self {
            text: Style::default()
                .fg(Color::White)
                .bg(Color::Black)
                .add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::DarkGray).bg(Color::Black),
            hint: Style::default().add_modifier(Modifier::DIM),
        }
    }
}
