//! Cache Store Module
//!
//! The cache engine: count and weight bounded LRU eviction, TTL expiration,
//! statistics and notifications on top of a pluggable recency store.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use tracing::{debug, warn};

use crate::cache::clock::{system_clock, Clock, SharedClock};
use crate::cache::contract::{CacheKey, CacheValue, LruCache};
use crate::cache::entry::CacheEntry;
use crate::cache::events::{CacheEvent, EventKind, EventRegistry, ListenerId};
use crate::cache::options::{CacheOptions, EntryOptions};
use crate::cache::stats::CacheStats;
use crate::error::Result;
use crate::models::{SerializedCache, SerializedEntry};

// == Recency Store ==
/// Keyed entry storage that also tracks recency order.
///
/// The least recently used entry sits at the front; `push_mru` and `promote`
/// place an entry at the back.
pub trait RecencyStore<K: 'static, V: 'static> {
    fn with_capacity(capacity: usize) -> Self;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get<Q>(&self, key: &Q) -> Option<&CacheEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Mutable access, also returning the stored key.
    fn get_mut<Q>(&mut self, key: &Q) -> Option<(&K, &mut CacheEntry<V>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Appends a key that is not yet stored at the most recently used end.
    fn push_mru(&mut self, key: K, entry: CacheEntry<V>);

    /// Moves an existing key to the most recently used end.
    fn promote<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    fn remove<Q>(&mut self, key: &Q) -> Option<(K, CacheEntry<V>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Removes and returns the least recently used entry.
    fn pop_lru(&mut self) -> Option<(K, CacheEntry<V>)>;

    /// Removes everything, returning entries least recently used first.
    fn drain(&mut self) -> Vec<(K, CacheEntry<V>)>;

    /// Iterates least recently used first.
    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &CacheEntry<V>)> + '_>;
}

// == Cache Engine ==
/// LRU cache with weighted admission and lazy TTL expiration.
///
/// `S` decides how recency is tracked; see `OrderedMapCache` and
/// `LinkedListCache` for the two shipped variants.
pub struct CacheEngine<K, V, S> {
    /// Entries in recency order
    store: S,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Maximum aggregate weight allowed
    max_weight: u64,
    /// Sum of live entry weights, widened so that any `u64` weights add up
    total_weight: u128,
    /// Performance statistics
    stats: CacheStats,
    /// Minimum gap between purges triggered from `set`
    purge_interval_ms: u64,
    last_purge_ms: u64,
    events: EventRegistry<K, V>,
    clock: SharedClock,
}

impl<K, V, S> CacheEngine<K, V, S>
where
    K: CacheKey,
    V: CacheValue,
    S: RecencyStore<K, V>,
{
    // == Constructor ==
    /// Creates an empty cache on the system clock.
    pub fn new(options: CacheOptions) -> Self {
        Self::with_shared_clock(options, system_clock())
    }

    /// Creates an empty cache driven by `clock`.
    pub fn with_clock<C: Clock + 'static>(options: CacheOptions, clock: C) -> Self {
        Self::with_shared_clock(options, std::sync::Arc::new(clock))
    }

    pub(crate) fn with_shared_clock(options: CacheOptions, clock: SharedClock) -> Self {
        let capacity = options.effective_capacity();
        let now = clock.now_ms();
        Self {
            store: S::with_capacity(capacity.min(1024)),
            capacity,
            max_weight: options.effective_max_weight(),
            total_weight: 0,
            stats: CacheStats::new(),
            purge_interval_ms: options.purge_interval_ms,
            last_purge_ms: now,
            events: EventRegistry::new(),
            clock,
        }
    }

    /// Sizing options this cache was built with.
    pub fn options(&self) -> CacheOptions {
        CacheOptions::new(self.capacity)
            .with_max_weight(self.max_weight)
            .with_purge_interval_ms(self.purge_interval_ms)
    }

    // == Restore ==
    /// Restores a cache from `serialize` output, on the system clock.
    pub fn try_deserialize(data: &str) -> Result<Self> {
        Self::try_deserialize_with_clock(data, system_clock())
    }

    /// Restores a cache from `serialize` output, judging expiry by `clock`.
    ///
    /// Entries already past their deadline are dropped.
    pub fn try_deserialize_with_clock(data: &str, clock: SharedClock) -> Result<Self> {
        let record: SerializedCache<K, V> = serde_json::from_str(data)?;
        let mut cache = Self::with_shared_clock(record.options(), clock);
        let now = cache.clock.now_ms();
        let total = record.entries.len();

        for restored in record
            .entries
            .into_iter()
            .filter_map(|entry| entry.into_restored(now))
        {
            let key = restored.key.clone();
            cache.set(restored.key, restored.value, restored.options);
            if let (Some(created_at), Some((_, entry))) =
                (restored.created_at, cache.store.get_mut(&key))
            {
                entry.created_at = created_at;
            }
        }

        debug!(
            restored = cache.store.len(),
            skipped = total - cache.store.len(),
            "Restored cache snapshot"
        );
        Ok(cache)
    }

    /// Like `deserialize`, but judging expiry by `clock`.
    pub fn deserialize_with_clock(data: &str, clock: SharedClock) -> Self {
        match Self::try_deserialize_with_clock(data, clock.clone()) {
            Ok(cache) => cache,
            Err(err) => {
                warn!(error = %err, "Failed to restore cache snapshot, starting empty");
                Self::with_shared_clock(CacheOptions::default(), clock)
            }
        }
    }

    // == Internal Helpers ==
    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Drops an expired key and notifies `Expire` listeners.
    fn expire<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if let Some((key, entry)) = self.store.remove(key) {
            self.total_weight -= u128::from(entry.weight);
            self.events
                .emit(&CacheEvent::new(EventKind::Expire, &key, &entry.value));
        }
    }

    /// Evicts least recently used entries until a new entry of `weight` fits.
    fn make_room(&mut self, weight: u64) {
        let ceiling = u128::from(self.max_weight);
        while self.total_weight + u128::from(weight) > ceiling
            || self.store.len() >= self.capacity
        {
            let Some((key, entry)) = self.store.pop_lru() else {
                break;
            };
            self.total_weight -= u128::from(entry.weight);
            self.stats.record_eviction();
            debug!(weight = entry.weight, "Evicted least recently used entry");
            self.events
                .emit(&CacheEvent::new(EventKind::Delete, &key, &entry.value));
        }
    }

    fn purge_if_due(&mut self, now: u64) {
        if now.saturating_sub(self.last_purge_ms) > self.purge_interval_ms {
            self.purge_expired();
        }
    }

    #[cfg(test)]
    pub(crate) fn recomputed_weight(&self) -> u128 {
        self.store.iter().map(|(_, entry)| u128::from(entry.weight)).sum()
    }
}

impl<K, V, S> LruCache<K, V> for CacheEngine<K, V, S>
where
    K: CacheKey,
    V: CacheValue,
    S: RecencyStore<K, V>,
{
    // == Get ==
    fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.now();
        let expired = match self.store.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.expire(key);
            self.stats.record_miss();
            return None;
        }

        self.store.promote(key);
        let (stored_key, entry) = self.store.get_mut(key)?;
        entry.touch(now);
        let value = entry.value.clone();
        self.stats.record_hit();
        self.events
            .emit(&CacheEvent::new(EventKind::Get, stored_key, &value));
        Some(value)
    }

    // == Set ==
    fn set(&mut self, key: K, value: V, options: EntryOptions) {
        let now = self.now();
        self.purge_if_due(now);

        // Overwrite in place, swapping the old weight for the new one
        let value = match self.store.get_mut(&key) {
            Some((_, entry)) => {
                self.total_weight -= u128::from(entry.weight);
                entry.replace(value, &options, now);
                self.total_weight += u128::from(entry.weight);
                self.events
                    .emit(&CacheEvent::new(EventKind::Set, &key, &entry.value));
                None
            }
            None => Some(value),
        };
        let Some(value) = value else {
            self.store.promote(&key);
            return;
        };

        let entry = CacheEntry::new(value, &options, now);
        self.make_room(entry.weight);
        self.total_weight += u128::from(entry.weight);
        self.events
            .emit(&CacheEvent::new(EventKind::Set, &key, &entry.value));
        self.store.push_mru(key, entry);
    }

    // == Has ==
    fn has<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.now();
        let expired = match self.store.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };

        if expired {
            self.expire(key);
        }
        !expired
    }

    // == Delete ==
    fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.store.remove(key) {
            Some((key, entry)) => {
                self.total_weight -= u128::from(entry.weight);
                self.events
                    .emit(&CacheEvent::new(EventKind::Delete, &key, &entry.value));
                true
            }
            None => false,
        }
    }

    // == Clear ==
    fn clear(&mut self) {
        let drained = self.store.drain();
        self.total_weight = 0;
        for (key, entry) in &drained {
            self.events
                .emit(&CacheEvent::new(EventKind::Delete, key, &entry.value));
        }
        self.events.emit(&CacheEvent::clear());
        self.stats.reset_counters();
        debug!(removed = drained.len(), "Cleared cache");
    }

    fn size(&self) -> usize {
        self.store.len()
    }

    fn reset_stats(&mut self) {
        self.stats.reset_counters();
    }

    // == Stats ==
    fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.store.len(),
            total_weight: self.total_weight(),
            ..self.stats.clone()
        }
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn max_weight(&self) -> u64 {
        self.max_weight
    }

    /// Clamped to `u64::MAX` when the entries' weights sum past it.
    fn total_weight(&self) -> u64 {
        u64::try_from(self.total_weight).unwrap_or(u64::MAX)
    }

    fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.now();
        self.store
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| &entry.value)
    }

    fn entries(&self) -> Vec<(K, V)> {
        let now = self.now();
        self.store
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    // == Evict Where ==
    fn evict_where<P>(&mut self, mut predicate: P) -> usize
    where
        P: FnMut(&K, &V) -> bool,
    {
        // Collect first, delete second: the store cannot be mutated mid-iteration
        let matching: Vec<K> = self
            .store
            .iter()
            .filter(|(key, entry)| predicate(*key, &entry.value))
            .map(|(key, _)| key.clone())
            .collect();

        matching.iter().filter(|key| self.delete(*key)).count()
    }

    // == Purge Expired ==
    fn purge_expired(&mut self) -> usize {
        let now = self.now();
        let expired_keys: Vec<K> = self
            .store
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in &expired_keys {
            self.expire(key);
        }
        self.last_purge_ms = now;

        if count > 0 {
            debug!(removed = count, "Purged expired entries");
        }
        count
    }

    fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&CacheEvent<'_, K, V>) -> anyhow::Result<()> + Send + 'static,
    {
        self.events.on(kind, Box::new(listener))
    }

    fn off(&mut self, kind: EventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }

    fn remove_all_listeners(&mut self) {
        self.events.clear();
    }

    // == Serialize ==
    fn serialize(&self) -> String {
        let record = SerializedCache {
            capacity: self.capacity,
            max_weight: self.max_weight,
            purge_interval: self.purge_interval_ms,
            entries: self
                .store
                .iter()
                .map(|(key, entry)| SerializedEntry::from_entry(key, entry))
                .collect(),
        };

        serde_json::to_string(&record).unwrap_or_else(|err| {
            warn!(error = %err, "Failed to serialize cache entries, writing an empty snapshot");
            serde_json::json!({
                "capacity": self.capacity,
                "maxWeight": self.max_weight,
                "purgeInterval": self.purge_interval_ms,
                "entries": [],
            })
            .to_string()
        })
    }

    fn deserialize(data: &str) -> Self {
        Self::deserialize_with_clock(data, system_clock())
    }
}

impl<K, V, S> fmt::Debug for CacheEngine<K, V, S>
where
    K: CacheKey,
    V: CacheValue,
    S: RecencyStore<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEngine")
            .field("capacity", &self.capacity)
            .field("max_weight", &self.max_weight)
            .field("len", &self.store.len())
            .field("total_weight", &self.total_weight)
            .field("stats", &self.stats)
            .field("events", &self.events)
            .finish()
    }
}
