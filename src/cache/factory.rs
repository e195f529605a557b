//! Cache Factory Module
//!
//! Picks an implementation by kind and wraps snapshots with a kind tag so a
//! cache can be restored without knowing which implementation wrote it.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use tracing::warn;

use crate::cache::clock::{system_clock, Clock, SharedClock};
use crate::cache::contract::{CacheKey, CacheValue, LruCache};
use crate::cache::events::{CacheEvent, EventKind, ListenerId};
use crate::cache::linked::LinkedListCache;
use crate::cache::options::{CacheOptions, EntryOptions};
use crate::cache::ordered::OrderedMapCache;
use crate::cache::stats::CacheStats;
use crate::error::{Result, SnapshotError};
use crate::models::TaggedSnapshot;

// == Cache Kind ==
/// The available cache implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Recency kept by re-insertion into an ordered map
    #[default]
    OrderedMap,
    /// Recency kept by an explicit doubly-linked list
    LinkedList,
}

impl CacheKind {
    /// Tag used in snapshots and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::OrderedMap => "ordered-map",
            CacheKind::LinkedList => "linked-list",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheKind {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ordered-map" => Ok(CacheKind::OrderedMap),
            "linked-list" => Ok(CacheKind::LinkedList),
            other => Err(SnapshotError::UnknownKind(other.to_string())),
        }
    }
}

// == Any Cache ==
/// A cache of either kind behind the shared contract.
///
/// `serialize` on this type produces the tagged form, and `deserialize`
/// accepts it.
#[derive(Debug)]
pub enum AnyCache<K: CacheKey, V: CacheValue> {
    OrderedMap(OrderedMapCache<K, V>),
    LinkedList(LinkedListCache<K, V>),
}

macro_rules! dispatch {
    ($cache:expr, $inner:ident => $body:expr) => {
        match $cache {
            AnyCache::OrderedMap($inner) => $body,
            AnyCache::LinkedList($inner) => $body,
        }
    };
}

impl<K: CacheKey, V: CacheValue> AnyCache<K, V> {
    pub fn kind(&self) -> CacheKind {
        match self {
            AnyCache::OrderedMap(_) => CacheKind::OrderedMap,
            AnyCache::LinkedList(_) => CacheKind::LinkedList,
        }
    }
}

impl<K: CacheKey, V: CacheValue> LruCache<K, V> for AnyCache<K, V> {
    fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        dispatch!(self, cache => cache.get(key))
    }

    fn set(&mut self, key: K, value: V, options: EntryOptions) {
        dispatch!(self, cache => cache.set(key, value, options))
    }

    fn has<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        dispatch!(self, cache => cache.has(key))
    }

    fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        dispatch!(self, cache => cache.delete(key))
    }

    fn clear(&mut self) {
        dispatch!(self, cache => cache.clear())
    }

    fn size(&self) -> usize {
        dispatch!(self, cache => cache.size())
    }

    fn reset_stats(&mut self) {
        dispatch!(self, cache => cache.reset_stats())
    }

    fn stats(&self) -> CacheStats {
        dispatch!(self, cache => cache.stats())
    }

    fn capacity(&self) -> usize {
        dispatch!(self, cache => cache.capacity())
    }

    fn max_weight(&self) -> u64 {
        dispatch!(self, cache => cache.max_weight())
    }

    fn total_weight(&self) -> u64 {
        dispatch!(self, cache => cache.total_weight())
    }

    fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        dispatch!(self, cache => cache.peek(key))
    }

    fn entries(&self) -> Vec<(K, V)> {
        dispatch!(self, cache => cache.entries())
    }

    fn evict_where<P>(&mut self, predicate: P) -> usize
    where
        P: FnMut(&K, &V) -> bool,
    {
        dispatch!(self, cache => cache.evict_where(predicate))
    }

    fn purge_expired(&mut self) -> usize {
        dispatch!(self, cache => cache.purge_expired())
    }

    fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&CacheEvent<'_, K, V>) -> anyhow::Result<()> + Send + 'static,
    {
        dispatch!(self, cache => cache.on(kind, listener))
    }

    fn off(&mut self, kind: EventKind, id: ListenerId) -> bool {
        dispatch!(self, cache => cache.off(kind, id))
    }

    fn remove_all_listeners(&mut self) {
        dispatch!(self, cache => cache.remove_all_listeners())
    }

    /// Tagged form: `{"type": "<kind>", "data": "<implementation snapshot>"}`.
    fn serialize(&self) -> String {
        let data = dispatch!(self, cache => cache.serialize());
        tag(self.kind(), data)
    }

    fn deserialize(data: &str) -> Self {
        deserialize(data)
    }
}

// == Create ==
/// Builds an empty cache of the requested kind on the system clock.
pub fn create<K: CacheKey, V: CacheValue>(
    kind: CacheKind,
    options: CacheOptions,
) -> AnyCache<K, V> {
    create_with_shared_clock(kind, options, system_clock())
}

/// Builds an empty cache of the requested kind driven by `clock`.
pub fn create_with_clock<K, V, C>(
    kind: CacheKind,
    options: CacheOptions,
    clock: C,
) -> AnyCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
    C: Clock + 'static,
{
    create_with_shared_clock(kind, options, std::sync::Arc::new(clock))
}

fn create_with_shared_clock<K: CacheKey, V: CacheValue>(
    kind: CacheKind,
    options: CacheOptions,
    clock: SharedClock,
) -> AnyCache<K, V> {
    match kind {
        CacheKind::OrderedMap => {
            AnyCache::OrderedMap(OrderedMapCache::with_shared_clock(options, clock))
        }
        CacheKind::LinkedList => {
            AnyCache::LinkedList(LinkedListCache::with_shared_clock(options, clock))
        }
    }
}

// == Serialize ==
/// Wraps `cache.serialize()` with the kind tag.
///
/// If the cache already produces the tagged form (an [`AnyCache`]), the inner
/// data is re-tagged rather than nested.
pub fn serialize<K, V, C>(cache: &C, kind: CacheKind) -> String
where
    K: CacheKey,
    V: CacheValue,
    C: LruCache<K, V>,
{
    let data = cache.serialize();
    match serde_json::from_str::<TaggedSnapshot>(&data) {
        Ok(inner) => tag(kind, inner.data),
        Err(_) => tag(kind, data),
    }
}

fn tag(kind: CacheKind, data: String) -> String {
    serde_json::json!({ "type": kind.as_str(), "data": data }).to_string()
}

// == Deserialize ==
/// Restores a cache from the tagged form, on the system clock.
///
/// Never fails: an unknown tag or unreadable data yields an empty
/// ordered-map cache with default options.
pub fn deserialize<K: CacheKey, V: CacheValue>(tagged: &str) -> AnyCache<K, V> {
    deserialize_with_shared_clock(tagged, system_clock())
}

/// Like [`deserialize`], judging expiry by `clock`.
pub fn deserialize_with_clock<K, V, C>(tagged: &str, clock: C) -> AnyCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
    C: Clock + 'static,
{
    deserialize_with_shared_clock(tagged, std::sync::Arc::new(clock))
}

/// Restores a cache from the tagged form, reporting why it could not.
pub fn try_deserialize<K: CacheKey, V: CacheValue>(tagged: &str) -> Result<AnyCache<K, V>> {
    try_deserialize_with_shared_clock(tagged, system_clock())
}

fn try_deserialize_with_shared_clock<K: CacheKey, V: CacheValue>(
    tagged: &str,
    clock: SharedClock,
) -> Result<AnyCache<K, V>> {
    let envelope: TaggedSnapshot = serde_json::from_str(tagged)?;
    let cache = match envelope.kind.parse::<CacheKind>()? {
        CacheKind::OrderedMap => AnyCache::OrderedMap(OrderedMapCache::try_deserialize_with_clock(
            &envelope.data,
            clock,
        )?),
        CacheKind::LinkedList => AnyCache::LinkedList(
            LinkedListCache::try_deserialize_with_clock(&envelope.data, clock)?,
        ),
    };
    Ok(cache)
}

fn deserialize_with_shared_clock<K: CacheKey, V: CacheValue>(
    tagged: &str,
    clock: SharedClock,
) -> AnyCache<K, V> {
    match try_deserialize_with_shared_clock(tagged, clock.clone()) {
        Ok(cache) => cache,
        Err(err) => {
            warn!(error = %err, "Failed to restore tagged cache snapshot, starting empty");
            create_with_shared_clock(CacheKind::OrderedMap, CacheOptions::default(), clock)
        }
    }
}
