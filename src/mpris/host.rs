//! MPRIS players as media elements.
//!
//! Every player on the session bus is a candidate element. Its identity is the
//! unique connection name owning the well-known name, so a player that quits
//! and comes back is a different element. Listeners are tokio tasks that
//! forward player signals to the controller and are aborted on unlisten.

use crate::host::{ElementEvent, ElementId, ElementTable, HostError, MediaHost, PlaybackEventKind};
use crate::mpris::connection::{MprisError, list_bus_names, name_owner};
use crate::mpris::playback::{get_playback_status, get_position};
use crate::selector::{Candidate, PlayerSelector, TieBreak};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zbus::proxy;

/// MPRIS MediaPlayer2.Player interface proxy
#[proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2"
)]
trait MediaPlayer2Player {
    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;

    #[zbus(signal)]
    fn seeked(&self, position: i64) -> zbus::Result<()>;
}

/// Bus identity of one player instance.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlayerKey {
    service: String,
    owner: String,
}

pub struct MprisHost {
    conn: Arc<zbus::Connection>,
    selector: PlayerSelector,
    elements: ElementTable<PlayerKey>,
    listeners: HashMap<(ElementId, PlaybackEventKind), JoinHandle<()>>,
    events: mpsc::Sender<ElementEvent>,
}

impl MprisHost {
    pub fn new(conn: Arc<zbus::Connection>, selector: PlayerSelector, events: mpsc::Sender<ElementEvent>) -> Self {
        Self {
            conn,
            selector,
            elements: ElementTable::new(),
            listeners: HashMap::new(),
            events,
        }
    }

    fn key(&self, element: ElementId) -> Result<&PlayerKey, HostError> {
        self.elements.get(element).ok_or(HostError::UnknownElement(element))
    }

    async fn candidates(&self) -> Result<Vec<Candidate<PlayerKey>>, MprisError> {
        let names = list_bus_names(&self.conn).await?;
        let mut candidates = Vec::new();
        for service in self.selector.eligible(names.iter().map(String::as_str)) {
            let Some(owner) = usable_owner(service, name_owner(&self.conn, service).await) else {
                continue;
            };
            let playing = if self.selector.tie_break() == TieBreak::Playing {
                get_playback_status(&self.conn, &owner)
                    .await
                    .map(|status| status == "Playing")
                    .unwrap_or(false)
            } else {
                false
            };
            candidates.push(Candidate {
                name: service.to_string(),
                playing,
                value: PlayerKey { service: service.to_string(), owner },
            });
        }
        Ok(candidates)
    }

    async fn spawn_listener(&self, element: ElementId, kind: PlaybackEventKind) -> Result<JoinHandle<()>, HostError> {
        let key = self.key(element)?;
        let proxy = MediaPlayer2PlayerProxy::builder(&self.conn)
            .destination(key.owner.clone())
            .map_err(MprisError::from)?
            .build()
            .await
            .map_err(MprisError::from)?;
        let events = self.events.clone();
        let service = key.service.clone();

        let task = match kind {
            PlaybackEventKind::TimeProgressed => {
                let mut seeked = proxy.receive_seeked().await.map_err(MprisError::from)?;
                tokio::spawn(async move {
                    while seeked.next().await.is_some() {
                        if events.send(ElementEvent { element, kind }).await.is_err() {
                            break;
                        }
                    }
                    tracing::debug!(service = %service, "seek stream ended");
                })
            }
            PlaybackEventKind::Paused | PlaybackEventKind::Resumed => {
                let mut status = proxy.receive_playback_status_changed().await;
                tokio::spawn(async move {
                    // The property stream is fed by the proxy's cache.
                    let _proxy = proxy;
                    while let Some(change) = status.next().await {
                        match change.get().await {
                            Ok(value) if status_event(kind, &value) => {
                                if events.send(ElementEvent { element, kind }).await.is_err() {
                                    break;
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                tracing::debug!(service = %service, error = %e, "unreadable playback status");
                            }
                        }
                    }
                    tracing::debug!(service = %service, "status stream ended");
                })
            }
        };
        Ok(task)
    }
}

/// The owner to use for `service`, or None to skip it for this tick.
///
/// The name can vanish between ListNames and the lookup. Any other failure is
/// confined to this one player so the rest of the candidates survive.
fn usable_owner(service: &str, owner: Result<Option<String>, MprisError>) -> Option<String> {
    match owner {
        Ok(owner) => owner,
        Err(e) => {
            tracing::debug!(service, error = %e, "Failed to resolve player owner, skipping");
            None
        }
    }
}

/// Whether a `PlaybackStatus` value is the notification `kind` listens for.
fn status_event(kind: PlaybackEventKind, status: &str) -> bool {
    matches!(
        (kind, status),
        (PlaybackEventKind::Paused, "Paused") | (PlaybackEventKind::Resumed, "Playing")
    )
}

impl MediaHost for MprisHost {
    async fn query_primary(&mut self) -> Result<Option<ElementId>, HostError> {
        let candidates = self.candidates().await?;
        self.elements.retain(|key| candidates.iter().any(|c| &c.value == key));
        tracing::trace!(candidates = candidates.len(), known = self.elements.len(), "Queried players");
        let Some(picked) = self.selector.pick(candidates) else {
            return Ok(None);
        };
        Ok(Some(self.elements.intern(picked.value)))
    }

    async fn position(&mut self, element: ElementId) -> Result<f64, HostError> {
        let owner = self.key(element)?.owner.clone();
        Ok(get_position(&self.conn, &owner).await?)
    }

    async fn listen(&mut self, element: ElementId, kind: PlaybackEventKind) -> Result<(), HostError> {
        if self.listeners.contains_key(&(element, kind)) {
            return Ok(());
        }
        let task = self.spawn_listener(element, kind).await?;
        self.listeners.insert((element, kind), task);
        Ok(())
    }

    fn unlisten(&mut self, element: ElementId, kind: PlaybackEventKind) {
        if let Some(task) = self.listeners.remove(&(element, kind)) {
            task.abort();
        }
    }
}

impl Drop for MprisHost {
    fn drop(&mut self) {
        for (_, task) in self.listeners.drain() {
            task.abort();
        }
    }
}
