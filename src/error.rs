//! Error types for the cache engine
//!
//! Cache operations themselves never fail. The only fallible path is restoring
//! a cache from a serialized snapshot, and even that is normally swallowed by
//! `deserialize`, which falls back to an empty cache.

use thiserror::Error;

// == Snapshot Error Enum ==
/// Reasons a serialized snapshot could not be restored.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The blob is not valid JSON or does not match the snapshot layout
    #[error("Malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The factory tag names an implementation this crate does not know
    #[error("Unknown cache kind: {0}")]
    UnknownKind(String),
}

// == Result Type Alias ==
/// Convenience Result type for snapshot handling.
pub type Result<T> = std::result::Result<T, SnapshotError>;
