//! Cache Module
//!
//! In-memory LRU caching with weighted eviction, TTL expiration, change
//! notifications and snapshots, in two interchangeable implementations.

mod clock;
mod contract;
mod entry;
mod events;
mod factory;
mod linked;
mod options;
mod ordered;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{system_clock, Clock, ManualClock, SharedClock, SystemClock};
pub use contract::{CacheKey, CacheValue, LruCache};
pub use entry::CacheEntry;
pub use events::{CacheEvent, EventKind, EventRegistry, Listener, ListenerId};
pub use factory::{
    create, create_with_clock, deserialize, deserialize_with_clock, serialize, try_deserialize,
    AnyCache, CacheKind,
};
pub use linked::{LinkedListCache, LinkedStore};
pub use options::{CacheOptions, EntryOptions, DEFAULT_CAPACITY, DEFAULT_PURGE_INTERVAL_MS};
pub use ordered::{OrderedMapCache, OrderedStore};
pub use stats::CacheStats;
pub use store::{CacheEngine, RecencyStore};
