//! Models Module
//!
//! Serde records for the cache snapshot format.

mod snapshot;

pub use snapshot::{RestoredEntry, SerializedCache, SerializedEntry, TaggedSnapshot};
