//! Event Module
//!
//! Observer registry notified when entries are written, read, removed or expire.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use tracing::warn;

// == Event Kind ==
/// The kinds of notifications a cache emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A key was inserted or overwritten
    Set,
    /// A lookup hit a live entry
    Get,
    /// A key was removed explicitly, by predicate, by eviction or by `clear`
    Delete,
    /// The whole cache was cleared (emitted after the per-key deletes)
    Clear,
    /// A key was dropped because its TTL elapsed
    Expire,
}

// == Cache Event ==
/// Payload handed to listeners. `key` and `value` are absent for `Clear`.
#[derive(Debug)]
pub struct CacheEvent<'a, K, V> {
    pub kind: EventKind,
    pub key: Option<&'a K>,
    pub value: Option<&'a V>,
}

impl<'a, K, V> CacheEvent<'a, K, V> {
    pub fn new(kind: EventKind, key: &'a K, value: &'a V) -> Self {
        Self {
            kind,
            key: Some(key),
            value: Some(value),
        }
    }

    pub fn clear() -> Self {
        Self {
            kind: EventKind::Clear,
            key: None,
            value: None,
        }
    }
}

/// Boxed listener callback. Returning `Err` is logged and otherwise ignored.
pub type Listener<K, V> = Box<dyn Fn(&CacheEvent<'_, K, V>) -> anyhow::Result<()> + Send>;

/// Handle returned by registration, used to unregister the same listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// == Event Registry ==
/// Listeners grouped by event kind.
pub struct EventRegistry<K, V> {
    next_id: u64,
    listeners: HashMap<EventKind, Vec<(ListenerId, Listener<K, V>)>>,
}

impl<K, V> EventRegistry<K, V> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: HashMap::new(),
        }
    }

    // == Register ==
    /// Adds a listener for `kind` and returns its handle.
    pub fn on(&mut self, kind: EventKind, listener: Listener<K, V>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.entry(kind).or_default().push((id, listener));
        id
    }

    // == Unregister ==
    /// Removes the listener registered under `id` for `kind`.
    ///
    /// Returns false if no such listener was registered.
    pub fn off(&mut self, kind: EventKind, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.listeners.remove(&kind);
        }
        removed
    }

    /// Drops every registered listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Number of listeners registered for `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    // == Emit ==
    /// Invokes every listener for the event's kind.
    ///
    /// Each call is isolated: an `Err` or a panic from one listener is logged
    /// and the remaining listeners still run.
    pub fn emit(&self, event: &CacheEvent<'_, K, V>) {
        let Some(list) = self.listeners.get(&event.kind) else {
            return;
        };

        for (id, listener) in list {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(
                        event = ?event.kind,
                        listener = id.0,
                        error = %err,
                        "Cache listener failed"
                    );
                }
                Err(_) => {
                    warn!(event = ?event.kind, listener = id.0, "Cache listener panicked");
                }
            }
        }
    }
}

impl<K, V> Default for EventRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for EventRegistry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<EventKind, usize> = self
            .listeners
            .iter()
            .map(|(kind, list)| (*kind, list.len()))
            .collect();
        f.debug_struct("EventRegistry")
            .field("listeners", &counts)
            .finish()
    }
}
