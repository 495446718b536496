//! Pipe mode: one line on stdout per visible change, for scripting and status bars.

use crate::ui::PresentationSink;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeFormat {
    /// The time while shown, an empty line once hidden.
    Plain,
    /// `{"visible":true,"text":"00:12.7"}`
    Json,
}

#[derive(Serialize)]
struct PipeLine<'a> {
    visible: bool,
    text: &'a str,
}

pub struct PipeSink<W: Write> {
    out: W,
    format: PipeFormat,
    text: String,
    visible: bool,
    last_emitted: Option<(bool, String)>,
    write_failed: bool,
}

impl<W: Write> PipeSink<W> {
    pub fn new(out: W, format: PipeFormat) -> Self {
        Self {
            out,
            format,
            text: String::new(),
            visible: false,
            last_emitted: None,
            write_failed: false,
        }
    }

    fn emit_if_changed(&mut self) {
        let shown = if self.visible { self.text.as_str() } else { "" };
        let current = (self.visible, shown);
        if self.last_emitted.as_ref().map(|(v, t)| (*v, t.as_str())) == Some(current) {
            return;
        }
        // Nothing has been shown yet; a leading blank line would be noise.
        if self.last_emitted.is_none() && !self.visible {
            self.last_emitted = Some((false, String::new()));
            return;
        }

        let line = match self.format {
            PipeFormat::Plain => shown.to_string(),
            PipeFormat::Json => match serde_json::to_string(&PipeLine { visible: self.visible, text: shown }) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode pipe line");
                    return;
                }
            },
        };
        match writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            Ok(()) => self.write_failed = false,
            Err(e) if !self.write_failed => {
                self.write_failed = true;
                tracing::warn!(error = %e, "Failed to write to stdout");
            }
            Err(_) => {}
        }
        self.last_emitted = Some((self.visible, shown.to_string()));
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PresentationSink for PipeSink<W> {
    fn set_text(&mut self, text: &str) {
        if self.text != text {
            self.text = text.to_string();
            self.emit_if_changed();
        }
    }

    fn show(&mut self) {
        self.visible = true;
        self.emit_if_changed();
    }

    fn hide(&mut self) {
        self.visible = false;
        self.emit_if_changed();
    }
}
