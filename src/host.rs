//! Host abstraction: media elements we observe but never own.
//!
//! A host exposes zero or more media elements whose lifetime is entirely its
//! own. We refer to them through [`ElementId`] handles into an
//! [`ElementTable`], never through owning references, and learn about playback
//! through [`ElementEvent`]s pushed onto a channel the host was built with.

use crate::mpris::connection::MprisError;
use std::fmt;

/// Non-owning handle to a media element. Slots are recycled with a bumped
/// generation, so a handle to a torn-down element never aliases a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId {
    index: u32,
    generation: u32,
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Native playback notifications an element can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackEventKind {
    TimeProgressed,
    Paused,
    Resumed,
}

impl PlaybackEventKind {
    pub const ALL: [PlaybackEventKind; 3] = [
        PlaybackEventKind::TimeProgressed,
        PlaybackEventKind::Paused,
        PlaybackEventKind::Resumed,
    ];
}

/// A notification from a subscribed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementEvent {
    pub element: ElementId,
    pub kind: PlaybackEventKind,
}

#[derive(thiserror::Error, Debug)]
pub enum HostError {
    #[error(transparent)]
    Mpris(#[from] MprisError),
    #[error("element {0} is no longer present")]
    UnknownElement(ElementId),
}

/// The page-like environment hosting media elements.
///
/// Implementations push [`ElementEvent`]s for every registered listener onto
/// the channel they were constructed with.
pub trait MediaHost {
    /// Find the primary media element, if one is currently present.
    async fn query_primary(&mut self) -> Result<Option<ElementId>, HostError>;

    /// Current playback position of `element`, in seconds.
    async fn position(&mut self, element: ElementId) -> Result<f64, HostError>;

    /// Register a listener for `kind` on `element`.
    async fn listen(&mut self, element: ElementId, kind: PlaybackEventKind) -> Result<(), HostError>;

    /// Remove the listener for `kind` on `element`. Unknown listeners are ignored.
    fn unlisten(&mut self, element: ElementId, kind: PlaybackEventKind);
}

#[derive(Debug)]
struct Slot<K> {
    generation: u32,
    key: Option<K>,
}

/// Side table mapping element handles to whatever key the host uses to find
/// the element again (a bus name, a simulated node id, ...).
#[derive(Debug)]
pub struct ElementTable<K> {
    slots: Vec<Slot<K>>,
    free: Vec<u32>,
}

impl<K> Default for ElementTable<K> {
    fn default() -> Self {
        Self { slots: Vec::new(), free: Vec::new() }
    }
}

impl<K: PartialEq> ElementTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `key`, allocating one if the key is new.
    pub fn intern(&mut self, key: K) -> ElementId {
        if let Some(id) = self.find(&key) {
            return id;
        }
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.key = Some(key);
            return ElementId { index, generation: slot.generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, key: Some(key) });
        ElementId { index, generation: 0 }
    }

    pub fn find(&self, key: &K) -> Option<ElementId> {
        self.slots.iter().enumerate().find_map(|(index, slot)| {
            (slot.key.as_ref() == Some(key)).then_some(ElementId {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    pub fn get(&self, id: ElementId) -> Option<&K> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.key.as_ref())
    }

    /// Retire every handle whose key fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.key.as_ref().is_some_and(|key| !keep(key)) {
                slot.key = None;
                self.free.push(index as u32);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.key.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_stable_for_live_keys() {
        let mut table = ElementTable::new();
        let a = table.intern("a");
        let b = table.intern("b");
        assert_ne!(a, b);
        assert_eq!(table.intern("a"), a);
        assert_eq!(table.get(b), Some(&"b"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn retired_handles_do_not_alias_new_elements() {
        let mut table = ElementTable::new();
        let old = table.intern(":1.10");
        table.retain(|key| *key != ":1.10");
        assert_eq!(table.get(old), None);

        let new = table.intern(":1.11");
        assert_ne!(old, new);
        assert_eq!(table.get(old), None);
        assert_eq!(table.get(new), Some(&":1.11"));
    }

    #[test]
    fn reinserted_key_gets_a_fresh_handle() {
        let mut table = ElementTable::new();
        let first = table.intern("video");
        table.retain(|_| false);
        let second = table.intern("video");
        assert_ne!(first, second);
        assert_eq!(table.len(), 1);
    }
}
