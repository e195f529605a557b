//! Ordered-Map LRU Module
//!
//! Recency is the iteration order of a `LinkedHashMap`: the front is the
//! least recently used entry, and promoting a key moves it to the back.
//! Lookup, promotion and front removal are all constant time.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use hashlink::linked_hash_map::RawEntryMut;
use hashlink::LinkedHashMap;

use crate::cache::entry::CacheEntry;
use crate::cache::store::{CacheEngine, RecencyStore};

/// LRU cache backed by an insertion-ordered map.
pub type OrderedMapCache<K, V> = CacheEngine<K, V, OrderedStore<K, V>>;

// == Ordered Store ==
/// Insertion-ordered entry storage.
pub struct OrderedStore<K, V> {
    entries: LinkedHashMap<K, CacheEntry<V>>,
}

impl<K, V> RecencyStore<K, V> for OrderedStore<K, V>
where
    K: Hash + Eq + 'static,
    V: 'static,
{
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: LinkedHashMap::with_capacity(capacity),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get<Q>(&self, key: &Q) -> Option<&CacheEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    fn get_mut<Q>(&mut self, key: &Q) -> Option<(&K, &mut CacheEntry<V>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.raw_entry_mut().from_key(key) {
            RawEntryMut::Occupied(occupied) => {
                let (stored_key, entry) = occupied.into_key_value();
                Some((&*stored_key, entry))
            }
            RawEntryMut::Vacant(_) => None,
        }
    }

    fn push_mru(&mut self, key: K, entry: CacheEntry<V>) {
        self.entries.insert(key, entry);
    }

    // == Promote ==
    /// Relinks the key after every other entry.
    fn promote<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.to_back(key);
    }

    fn remove<Q>(&mut self, key: &Q) -> Option<(K, CacheEntry<V>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove_entry(key)
    }

    fn pop_lru(&mut self) -> Option<(K, CacheEntry<V>)> {
        self.entries.pop_front()
    }

    fn drain(&mut self) -> Vec<(K, CacheEntry<V>)> {
        self.entries.drain().collect()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &CacheEntry<V>)> + '_> {
        Box::new(self.entries.iter())
    }
}

impl<K: Hash + Eq, V> fmt::Debug for OrderedStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedStore")
            .field("len", &self.entries.len())
            .finish()
    }
}
