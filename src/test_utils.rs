//! In-memory doubles for the host, sink, store and menu seams.

use crate::host::{ElementEvent, ElementId, ElementTable, HostError, MediaHost, PlaybackEventKind};
use crate::menu::{HostMenu, MenuCommand};
use crate::prefs::{PreferenceStore, PrefsError};
use crate::selector::{Candidate, PlayerSelector};
use crate::ui::PresentationSink;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone)]
struct SimNode {
    class: String,
    position: f64,
    readable: bool,
    playing: bool,
}

#[derive(Default)]
struct PageState {
    next_node: u64,
    nodes: Vec<(u64, SimNode)>,
    listeners: HashSet<(u64, PlaybackEventKind)>,
    fail_listen: Option<PlaybackEventKind>,
}

/// A fake page whose media nodes tests add, remove and drive directly.
#[derive(Clone, Default)]
pub struct SimPage {
    state: Arc<Mutex<PageState>>,
    events: Arc<Mutex<Option<mpsc::Sender<ElementEvent>>>>,
    handles: Arc<Mutex<HashMap<u64, ElementId>>>,
}

/// Node identifier inside a [`SimPage`].
pub type NodeId = u64;

impl SimPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the host the controller will own.
    pub fn host(&self, selector: PlayerSelector, events: mpsc::Sender<ElementEvent>) -> SimHost {
        *lock(&self.events) = Some(events);
        SimHost { page: self.clone(), selector, elements: ElementTable::new() }
    }

    pub fn insert(&self, class: &str, position: f64) -> NodeId {
        let mut state = lock(&self.state);
        state.next_node += 1;
        let id = state.next_node;
        state.nodes.push((id, SimNode { class: class.to_string(), position, readable: true, playing: true }));
        id
    }

    /// Tear a node down. Like a real page, listeners stay registered on it.
    pub fn remove(&self, node: NodeId) {
        lock(&self.state).nodes.retain(|(id, _)| *id != node);
    }

    pub fn set_position(&self, node: NodeId, position: f64) {
        if let Some((_, n)) = lock(&self.state).nodes.iter_mut().find(|(id, _)| *id == node) {
            n.position = position;
        }
    }

    /// Make position reads of a live node fail, or succeed again.
    pub fn set_position_readable(&self, node: NodeId, readable: bool) {
        if let Some((_, n)) = lock(&self.state).nodes.iter_mut().find(|(id, _)| *id == node) {
            n.readable = readable;
        }
    }

    pub fn set_playing(&self, node: NodeId, playing: bool) {
        if let Some((_, n)) = lock(&self.state).nodes.iter_mut().find(|(id, _)| *id == node) {
            n.playing = playing;
        }
    }

    /// Make every registration of `kind` fail until cleared.
    pub fn fail_listen(&self, kind: Option<PlaybackEventKind>) {
        lock(&self.state).fail_listen = kind;
    }

    /// Total listeners registered across all nodes, live or torn down.
    pub fn listener_count(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    pub fn listeners_on(&self, node: NodeId) -> usize {
        lock(&self.state).listeners.iter().filter(|(id, _)| *id == node).count()
    }

    /// Fire a native event on `node`. Returns false if nobody listens to it.
    pub fn fire(&self, node: NodeId, kind: PlaybackEventKind) -> bool {
        if !lock(&self.state).listeners.contains(&(node, kind)) {
            return false;
        }
        let Some(element) = lock(&self.handles).get(&node).copied() else {
            return false;
        };
        let sender = lock(&self.events).clone();
        sender.is_some_and(|tx| tx.try_send(ElementEvent { element, kind }).is_ok())
    }
}

pub struct SimHost {
    page: SimPage,
    selector: PlayerSelector,
    elements: ElementTable<NodeId>,
}

impl SimHost {
    fn node(&self, element: ElementId) -> Result<NodeId, HostError> {
        self.elements.get(element).copied().ok_or(HostError::UnknownElement(element))
    }
}

impl MediaHost for SimHost {
    async fn query_primary(&mut self) -> Result<Option<ElementId>, HostError> {
        let candidates: Vec<Candidate<NodeId>> = lock(&self.page.state)
            .nodes
            .iter()
            .map(|(id, node)| Candidate { name: node.class.clone(), playing: node.playing, value: *id })
            .collect();
        let live: HashSet<NodeId> = candidates.iter().map(|c| c.value).collect();
        self.elements.retain(|node| live.contains(node));
        let Some(picked) = self.selector.pick(candidates) else {
            return Ok(None);
        };
        let element = self.elements.intern(picked.value);
        lock(&self.page.handles).insert(picked.value, element);
        Ok(Some(element))
    }

    async fn position(&mut self, element: ElementId) -> Result<f64, HostError> {
        let node = self.node(element)?;
        lock(&self.page.state)
            .nodes
            .iter()
            .find(|(id, n)| *id == node && n.readable)
            .map(|(_, n)| n.position)
            .ok_or(HostError::UnknownElement(element))
    }

    async fn listen(&mut self, element: ElementId, kind: PlaybackEventKind) -> Result<(), HostError> {
        let node = self.node(element)?;
        let mut state = lock(&self.page.state);
        if state.fail_listen == Some(kind) {
            return Err(HostError::UnknownElement(element));
        }
        state.listeners.insert((node, kind));
        Ok(())
    }

    fn unlisten(&mut self, element: ElementId, kind: PlaybackEventKind) {
        // Handles of torn-down nodes are retired, but their listeners must still go.
        let node = self
            .elements
            .get(element)
            .copied()
            .or_else(|| lock(&self.page.handles).iter().find(|(_, e)| **e == element).map(|(n, _)| *n));
        if let Some(node) = node {
            lock(&self.page.state).listeners.remove(&(node, kind));
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    SetText(String),
    Show,
    Hide,
}

/// Sink recording every call, shared with the test through a clone.
#[derive(Clone, Default)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        lock(&self.calls).clone()
    }

    pub fn take(&self) -> Vec<SinkCall> {
        std::mem::take(&mut *lock(&self.calls))
    }

    /// Visibility after replaying every call so far (starts hidden).
    pub fn visible(&self) -> bool {
        lock(&self.calls).iter().fold(false, |visible, call| match call {
            SinkCall::Show => true,
            SinkCall::Hide => false,
            SinkCall::SetText(_) => visible,
        })
    }

    pub fn text(&self) -> Option<String> {
        lock(&self.calls).iter().rev().find_map(|call| match call {
            SinkCall::SetText(text) => Some(text.clone()),
            _ => None,
        })
    }
}

impl PresentationSink for RecordingSink {
    fn set_text(&mut self, text: &str) {
        lock(&self.calls).push(SinkCall::SetText(text.to_string()));
    }

    fn show(&mut self) {
        lock(&self.calls).push(SinkCall::Show);
    }

    fn hide(&mut self) {
        lock(&self.calls).push(SinkCall::Hide);
    }
}

/// Preference store kept in memory, optionally failing every call.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, bool>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(key: &str, value: bool) -> Self {
        let store = Self::default();
        lock(&store.values).insert(key.to_string(), value);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        *lock(&self.failing) = failing;
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        lock(&self.values).get(key).copied()
    }

    fn check(&self) -> Result<(), PrefsError> {
        if *lock(&self.failing) {
            return Err(PrefsError::Io {
                path: "memory".into(),
                source: std::io::Error::other("store unavailable"),
            });
        }
        Ok(())
    }
}

impl PreferenceStore for MemoryStore {
    async fn load(&self, key: &str, default: bool) -> Result<bool, PrefsError> {
        self.check()?;
        Ok(self.get(key).unwrap_or(default))
    }

    async fn save(&self, key: &str, value: bool) -> Result<(), PrefsError> {
        self.check()?;
        lock(&self.values).insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMenu {
    pub commands: Vec<(String, MenuCommand)>,
}

impl HostMenu for RecordingMenu {
    fn register_command(&mut self, label: &str, command: MenuCommand) {
        self.commands.push((label.to_string(), command));
    }
}
