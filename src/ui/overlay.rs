//! Fixed-position terminal overlay.
//!
//! Draws a small bordered box near the top-left corner of the terminal with
//! the current time, and an optional dimmed footer listing the available key
//! commands. Redraws only when what is on screen would change.

use crate::ui::PresentationSink;
use crate::ui::styles::OverlayStyles;
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    widgets::{Block, Padding, Paragraph},
};
use std::io::{self, Stdout};

/// Distance of the box from the top-left corner, in cells.
const OFFSET_X: u16 = 1;
const OFFSET_Y: u16 = 1;

#[derive(Debug, Default, Clone, PartialEq)]
struct OverlayView {
    text: String,
    visible: bool,
    hint: String,
}

pub struct TerminalOverlay<B: Backend> {
    terminal: Terminal<B>,
    styles: OverlayStyles,
    view: OverlayView,
}

impl<B: Backend> TerminalOverlay<B> {
    pub fn new(terminal: Terminal<B>) -> Self {
        let mut overlay = Self {
            terminal,
            styles: OverlayStyles::default(),
            view: OverlayView::default(),
        };
        overlay.redraw();
        overlay
    }

    /// Footer text, usually the list of registered menu commands.
    pub fn set_hint(&mut self, hint: impl Into<String>) {
        let hint = hint.into();
        if hint != self.view.hint {
            self.view.hint = hint;
            self.redraw();
        }
    }

    pub fn redraw(&mut self) {
        let view = &self.view;
        let styles = &self.styles;
        if let Err(e) = self.terminal.draw(|frame| render(frame, view, styles)) {
            tracing::warn!(error = %e, "Overlay redraw failed");
        }
    }

    #[cfg(test)]
    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }
}

fn render(frame: &mut Frame, view: &OverlayView, styles: &OverlayStyles) {
    let area = frame.area();
    if view.visible {
        // Border on both sides plus one cell of padding each way.
        let width = view.text.chars().count() as u16 + 4;
        let rect = Rect::new(area.x + OFFSET_X, area.y + OFFSET_Y, width, 3).intersection(area);
        let block = Block::bordered()
            .border_style(styles.border)
            .padding(Padding::horizontal(1));
        frame.render_widget(
            Paragraph::new(view.text.as_str()).style(styles.text).block(block),
            rect,
        );
    }
    if !view.hint.is_empty() && area.height > 0 {
        let footer = Rect::new(area.x, area.bottom() - 1, area.width, 1);
        frame.render_widget(Paragraph::new(view.hint.as_str()).style(styles.hint), footer);
    }
}

impl<B: Backend> PresentationSink for TerminalOverlay<B> {
    fn set_text(&mut self, text: &str) {
        if self.view.text != text {
            self.view.text = text.to_string();
            if self.view.visible {
                self.redraw();
            }
        }
    }

    fn show(&mut self) {
        if !self.view.visible {
            self.view.visible = true;
            self.redraw();
        }
    }

    fn hide(&mut self) {
        if self.view.visible {
            self.view.visible = false;
            self.redraw();
        }
    }
}

/// Raw-mode alternate screen; restores the terminal when dropped.
pub struct TerminalSession {
    _private: (),
}

impl TerminalSession {
    pub fn enter() -> io::Result<(Self, Terminal<CrosstermBackend<Stdout>>)> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok((Self { _private: () }, terminal))
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn overlay() -> TerminalOverlay<TestBackend> {
        TerminalOverlay::new(Terminal::new(TestBackend::new(30, 6)).unwrap())
    }

    fn screen(overlay: &TerminalOverlay<TestBackend>) -> Vec<String> {
        let buffer = overlay.terminal().backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    #[test]
    fn starts_hidden() {
        let overlay = overlay();
        assert!(screen(&overlay).iter().all(|row| row.trim().is_empty()));
    }

    #[test]
    fn shows_text_in_the_corner() {
        let mut overlay = overlay();
        overlay.set_text("00:12.7");
        overlay.show();
        let rows = screen(&overlay);
        assert!(rows[0].trim().is_empty());
        assert!(rows[2].starts_with(" │ 00:12.7 │"), "{rows:?}");
    }

    #[test]
    fn hide_clears_the_box() {
        let mut overlay = overlay();
        overlay.set_text("01:05.3");
        overlay.show();
        overlay.hide();
        assert!(screen(&overlay).iter().all(|row| !row.contains("01:05.3")));
    }

    #[test]
    fn hint_is_drawn_on_the_last_row() {
        let mut overlay = overlay();
        overlay.set_hint("t: toggle");
        let rows = screen(&overlay);
        assert!(rows[5].starts_with("t: toggle"));
    }
}
