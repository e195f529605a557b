//! Cache Contract Module
//!
//! The operation set shared by every cache implementation.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::events::{CacheEvent, EventKind, ListenerId};
use crate::cache::options::EntryOptions;
use crate::cache::stats::CacheStats;

/// Requirements on cache keys: hashable, cloneable and part of the snapshot format.
pub trait CacheKey: Eq + Hash + Clone + Serialize + DeserializeOwned + Send + 'static {}

impl<T> CacheKey for T where T: Eq + Hash + Clone + Serialize + DeserializeOwned + Send + 'static {}

/// Requirements on cached values.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + DeserializeOwned + Send + 'static {}

// == LRU Cache Contract ==
/// A bounded key/value cache with LRU eviction, optional per-entry expiry,
/// hit/miss statistics, change notifications and a string snapshot format.
///
/// No operation fails: bad option values are normalized, listener failures
/// are logged, and an unreadable snapshot restores as an empty cache.
pub trait LruCache<K: CacheKey, V: CacheValue> {
    /// Looks up a live entry, promoting it to most recently used.
    ///
    /// Counts a hit or a miss. Sliding entries have their deadline pushed out.
    fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Inserts or overwrites an entry, evicting least recently used entries
    /// until both the count and weight ceilings admit it.
    fn set(&mut self, key: K, value: V, options: EntryOptions);

    /// Reports whether a live entry exists, without touching recency or stats.
    fn has<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Removes an entry. Returns whether anything was removed.
    fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Removes every entry and resets the hit/miss counters.
    fn clear(&mut self);

    /// Number of stored entries.
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// hits / (hits + misses), or 0.0 before any lookup.
    fn hit_rate(&self) -> f64 {
        self.stats().hit_rate()
    }

    /// Zeroes the counters without touching entries.
    fn reset_stats(&mut self);

    fn stats(&self) -> CacheStats;

    fn capacity(&self) -> usize;

    fn max_weight(&self) -> u64;

    fn total_weight(&self) -> u64;

    /// Reads a live value without promoting it or counting the lookup.
    fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// All non-expired entries, least recently used first.
    fn entries(&self) -> Vec<(K, V)>;

    /// Runs `get` for each key and collects the hits.
    fn get_many(&mut self, keys: &[K]) -> HashMap<K, V> {
        keys.iter()
            .filter_map(|key| self.get(key).map(|value| (key.clone(), value)))
            .collect()
    }

    /// Runs `set` for each pair in order with the same options.
    fn set_many<I>(&mut self, entries: I, options: EntryOptions)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.set(key, value, options);
        }
    }

    /// Deletes every entry matching `predicate`. Returns the number removed.
    fn evict_where<P>(&mut self, predicate: P) -> usize
    where
        P: FnMut(&K, &V) -> bool;

    /// Removes every expired entry. Returns the number removed.
    fn purge_expired(&mut self) -> usize;

    /// Registers a listener for one event kind.
    fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&CacheEvent<'_, K, V>) -> anyhow::Result<()> + Send + 'static;

    /// Unregisters a listener. Returns false if it was not registered.
    fn off(&mut self, kind: EventKind, id: ListenerId) -> bool;

    fn remove_all_listeners(&mut self);

    /// Encodes configuration and entries (least recently used first) as JSON.
    fn serialize(&self) -> String;

    /// Restores a cache from `serialize` output.
    ///
    /// Never fails: unreadable input yields an empty cache with default options.
    fn deserialize(data: &str) -> Self
    where
        Self: Sized;
}
