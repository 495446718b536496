//! Presentation sinks: where the overlay text ends up.

pub mod overlay;
pub mod pipe;
pub mod styles;

/// A single on-screen node showing one line of text. Starts hidden.
pub trait PresentationSink {
    fn set_text(&mut self, text: &str);
    fn show(&mut self);
    fn hide(&mut self);
}
