//! Playback overlay controller.
//!
//! Keeps the overlay in step with a media element it neither owns nor hears
//! about when it comes and goes. A periodic discovery tick reconciles which
//! element is tracked; element events and ticks both re-run the visibility
//! policy, which is the only code that touches the sink's visibility.

use crate::format::{format_time, sanitize_position};
use crate::host::{ElementEvent, ElementId, MediaHost, PlaybackEventKind};
use crate::menu::{HostMenu, MenuCommand};
use crate::prefs::{DISPLAY_ENABLED_KEY, PreferenceStore};
use crate::ui::PresentationSink;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

pub const TOGGLE_LABEL: &str = "Toggle time display";

/// Shown while the tracked element's position has never been readable.
pub const UNKNOWN_TIME_TEXT: &str = "--:--.-";

/// Which element, if any, we are subscribed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachmentState {
    tracked: Option<ElementId>,
}

impl AttachmentState {
    pub fn tracked(&self) -> Option<ElementId> {
        self.tracked
    }
}

/// The user's on/off switch, persisted across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPreference {
    pub enabled: bool,
}

impl Default for DisplayPreference {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// What a discovery tick did to the attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Attached(ElementId),
    Switched { from: ElementId, to: ElementId },
    Detached(ElementId),
    Unchanged,
}

pub struct OverlayController<H, S, P> {
    host: H,
    sink: S,
    store: P,
    attachment: AttachmentState,
    preference: DisplayPreference,
    /// Element the sink's current text was read from.
    text_source: Option<ElementId>,
}

impl<H, S, P> OverlayController<H, S, P> {
    pub fn attachment(&self) -> AttachmentState {
        self.attachment
    }

    pub fn preference(&self) -> DisplayPreference {
        self.preference
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<H, S, P> OverlayController<H, S, P>
where
    H: MediaHost,
    S: PresentationSink,
    P: PreferenceStore,
{
    /// Load the preference, register the toggle command and draw once.
    ///
    /// The preference is loaded before the command is registered, so no
    /// toggle can race the load. A store failure falls back to enabled.
    pub async fn start(host: H, sink: S, store: P, menu: &mut impl HostMenu) -> Self {
        let default = DisplayPreference::default();
        let enabled = match store.load(DISPLAY_ENABLED_KEY, default.enabled).await {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load display preference, using default");
                default.enabled
            }
        };
        tracing::info!(enabled, "Loaded display preference");

        let mut controller = Self {
            host,
            sink,
            store,
            attachment: AttachmentState::default(),
            preference: DisplayPreference { enabled },
            text_source: None,
        };
        menu.register_command(TOGGLE_LABEL, MenuCommand::ToggleDisplay);
        controller.refresh().await;
        controller
    }

    /// Visibility policy. Visibility depends only on the preference and on
    /// whether an element is tracked; calling this again with unchanged
    /// inputs repeats the same sink calls.
    pub async fn refresh(&mut self) {
        if !self.preference.enabled {
            self.sink.hide();
            return;
        }
        let Some(element) = self.attachment.tracked else {
            self.sink.hide();
            return;
        };
        match self.host.position(element).await {
            Ok(position) => {
                self.sink.set_text(&format_time(sanitize_position(position)));
                self.text_source = Some(element);
            }
            Err(e) => {
                tracing::debug!(%element, error = %e, "Could not read playback position");
                // Keep this element's last reading, never another element's.
                if self.text_source != Some(element) {
                    self.sink.set_text(UNKNOWN_TIME_TEXT);
                    self.text_source = Some(element);
                }
            }
        }
        self.sink.show();
    }

    /// One discovery tick: reconcile the tracked element with what the host
    /// currently exposes, then re-run the visibility policy.
    pub async fn discover(&mut self) -> Transition {
        let found = match self.host.query_primary().await {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(error = %e, "Discovery failed, treating as no element");
                None
            }
        };

        let transition = match (self.attachment.tracked, found) {
            (None, None) => Transition::Unchanged,
            (Some(current), Some(found)) if current == found => Transition::Unchanged,
            (None, Some(found)) => {
                if self.subscribe(found).await {
                    Transition::Attached(found)
                } else {
                    Transition::Unchanged
                }
            }
            (Some(current), Some(found)) => {
                self.unsubscribe(current);
                if self.subscribe(found).await {
                    Transition::Switched { from: current, to: found }
                } else {
                    Transition::Detached(current)
                }
            }
            (Some(current), None) => {
                self.unsubscribe(current);
                Transition::Detached(current)
            }
        };
        if transition != Transition::Unchanged {
            tracing::info!(?transition, "Media element attachment changed");
        }

        self.refresh().await;
        transition
    }

    /// Flip the preference, persist it, and apply it right away.
    pub async fn toggle(&mut self) {
        self.preference.enabled = !self.preference.enabled;
        let enabled = self.preference.enabled;
        if let Err(e) = self.store.save(DISPLAY_ENABLED_KEY, enabled).await {
            tracing::warn!(error = %e, "Failed to save display preference");
        }
        self.refresh().await;
        tracing::info!(enabled, "Display toggled");
    }

    /// React to a native event from an element. Events from anything but
    /// the tracked element are stale and dropped.
    pub async fn handle_element_event(&mut self, event: ElementEvent) {
        if self.attachment.tracked != Some(event.element) {
            tracing::trace!(element = %event.element, kind = ?event.kind, "Dropping stale element event");
            return;
        }
        self.refresh().await;
    }

    /// Register all three listeners, or none of them.
    async fn subscribe(&mut self, element: ElementId) -> bool {
        for (registered, kind) in PlaybackEventKind::ALL.into_iter().enumerate() {
            if let Err(e) = self.host.listen(element, kind).await {
                tracing::warn!(%element, ?kind, error = %e, "Failed to subscribe to media element");
                for done in &PlaybackEventKind::ALL[..registered] {
                    self.host.unlisten(element, *done);
                }
                self.attachment.tracked = None;
                return false;
            }
        }
        self.attachment.tracked = Some(element);
        true
    }

    fn unsubscribe(&mut self, element: ElementId) {
        for kind in PlaybackEventKind::ALL {
            self.host.unlisten(element, kind);
        }
        self.attachment.tracked = None;
    }
}

/// Drive the controller until a quit command, Ctrl-C, or the command channel
/// closing. Ticks, element events and commands are handled one at a time on
/// the calling task.
pub async fn run<H, S, P>(
    controller: &mut OverlayController<H, S, P>,
    interval: Duration,
    mut events: mpsc::Receiver<ElementEvent>,
    mut commands: mpsc::Receiver<MenuCommand>,
) where
    H: MediaHost,
    S: PresentationSink,
    P: PreferenceStore,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            command = commands.recv() => match command {
                Some(MenuCommand::ToggleDisplay) => controller.toggle().await,
                Some(MenuCommand::Quit) | None => break,
            },
            Some(event) = events.recv() => controller.handle_element_event(event).await,
            _ = ticker.tick() => {
                controller.discover().await;
            }
        }
    }
}
