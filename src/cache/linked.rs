//! Linked-List LRU Module
//!
//! Recency is tracked by an explicit doubly-linked chain running from the head
//! (least recently used) to the tail (most recently used). Nodes live in an
//! arena and link to each other by slot index; a hash map points each key at
//! its slot, so promoting a key is a constant-time relink.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::cache::entry::CacheEntry;
use crate::cache::store::{CacheEngine, RecencyStore};

/// LRU cache backed by a hash map plus an arena-allocated linked list.
pub type LinkedListCache<K, V> = CacheEngine<K, V, LinkedStore<K, V>>;

// == Node ==
struct Node<K, V> {
    key: K,
    entry: CacheEntry<V>,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Linked Store ==
/// Hash map lookup over an arena-allocated doubly-linked list.
///
/// Invariants: the chain holds exactly `index.len()` nodes; `head` and `tail`
/// are both `None` iff the store is empty, and equal iff it holds one node.
pub struct LinkedStore<K, V> {
    /// Key to arena slot
    index: HashMap<K, usize>,
    /// Arena of nodes; `None` marks a free slot
    slots: Vec<Option<Node<K, V>>>,
    /// Free slots available for reuse
    free: Vec<usize>,
    /// Least recently used node
    head: Option<usize>,
    /// Most recently used node
    tail: Option<usize>,
}

impl<K, V> LinkedStore<K, V> {
    fn node(&self, slot: usize) -> &Node<K, V> {
        self.slots[slot]
            .as_ref()
            .expect("linked slot referenced by the chain must be occupied")
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node<K, V> {
        self.slots[slot]
            .as_mut()
            .expect("linked slot referenced by the chain must be occupied")
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    // == Link Tail ==
    /// Appends a detached node after the current tail.
    fn link_tail(&mut self, slot: usize) {
        let old_tail = self.tail;
        {
            let node = self.node_mut(slot);
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail) => self.node_mut(tail).next = Some(slot),
            // Empty chain: the node is also the head
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }

    // == Unlink ==
    /// Detaches a node, stitching its neighbours together and moving
    /// head/tail when the node sat at either end.
    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let node = self.node_mut(slot);
            let links = (node.prev, node.next);
            node.prev = None;
            node.next = None;
            links
        };

        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }

    // == Move To Tail ==
    /// Makes `slot` the most recently used node.
    fn move_to_tail(&mut self, slot: usize) {
        if self.tail == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.link_tail(slot);
    }

    // == Remove Node ==
    /// Unlinks a node and frees its slot. The index entry is left to the caller.
    fn remove_node(&mut self, slot: usize) -> Node<K, V> {
        self.unlink(slot);
        let node = self.slots[slot]
            .take()
            .expect("linked slot referenced by the chain must be occupied");
        self.free.push(slot);
        node
    }

    // == Remove Head ==
    fn remove_head(&mut self) -> Option<Node<K, V>> {
        let head = self.head?;
        Some(self.remove_node(head))
    }

    #[cfg(test)]
    fn assert_consistent(&self)
    where
        K: Hash + Eq,
    {
        let mut forward = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let node = self.node(slot);
            assert_eq!(node.prev, prev, "back link of slot {slot} is stale");
            assert_eq!(self.index.get(&node.key), Some(&slot));
            prev = Some(slot);
            cursor = node.next;
            forward += 1;
        }
        assert_eq!(prev, self.tail, "walk from head must end at tail");
        assert_eq!(forward, self.index.len(), "chain length must match index");
        assert_eq!(self.head.is_none(), self.tail.is_none());
        if self.index.len() == 1 {
            assert_eq!(self.head, self.tail);
        }
    }
}

impl<K, V> RecencyStore<K, V> for LinkedStore<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: 'static,
{
    fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn get<Q>(&self, key: &Q) -> Option<&CacheEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        Some(&self.node(slot).entry)
    }

    fn get_mut<Q>(&mut self, key: &Q) -> Option<(&K, &mut CacheEntry<V>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        let node = self.node_mut(slot);
        Some((&node.key, &mut node.entry))
    }

    fn push_mru(&mut self, key: K, entry: CacheEntry<V>) {
        let slot = self.alloc(Node {
            key: key.clone(),
            entry,
            prev: None,
            next: None,
        });
        self.link_tail(slot);
        self.index.insert(key, slot);
    }

    fn promote<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if let Some(&slot) = self.index.get(key) {
            self.move_to_tail(slot);
        }
    }

    fn remove<Q>(&mut self, key: &Q) -> Option<(K, CacheEntry<V>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.index.remove(key)?;
        let node = self.remove_node(slot);
        Some((node.key, node.entry))
    }

    fn pop_lru(&mut self) -> Option<(K, CacheEntry<V>)> {
        let node = self.remove_head()?;
        self.index.remove(&node.key);
        Some((node.key, node.entry))
    }

    fn drain(&mut self) -> Vec<(K, CacheEntry<V>)> {
        let mut drained = Vec::with_capacity(self.index.len());
        while let Some(node) = self.remove_head() {
            drained.push((node.key, node.entry));
        }
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        drained
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &CacheEntry<V>)> + '_> {
        Box::new(ChainIter {
            store: self,
            cursor: self.head,
        })
    }
}

// == Chain Iterator ==
/// Walks the chain from head to tail.
struct ChainIter<'a, K, V> {
    store: &'a LinkedStore<K, V>,
    cursor: Option<usize>,
}

impl<'a, K, V> Iterator for ChainIter<'a, K, V> {
    type Item = (&'a K, &'a CacheEntry<V>);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.store.node(self.cursor?);
        self.cursor = node.next;
        Some((&node.key, &node.entry))
    }
}

impl<K, V> fmt::Debug for LinkedStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedStore")
            .field("len", &self.index.len())
            .field("slots", &self.slots.len())
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}
