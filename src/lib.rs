//! LRU Engine - an in-process cache with weighted LRU eviction
//!
//! Provides a bounded key/value cache with fixed or sliding TTL expiration,
//! hit/miss statistics, change notifications and a JSON snapshot format, in
//! an ordered-map and a linked-list flavour behind one contract.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use cache::{AnyCache, CacheKind, CacheOptions, EntryOptions, EventKind, LruCache};
pub use config::CacheConfig;
pub use error::SnapshotError;
pub use tasks::spawn_purge_task;
