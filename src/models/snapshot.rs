//! Snapshot records
//!
//! Wire layout produced by `serialize` and consumed by `deserialize`:
//!
//! ```json
//! {
//!   "capacity": 100,
//!   "maxWeight": 100,
//!   "purgeInterval": 60000,
//!   "entries": [
//!     { "key": "a", "value": "x", "expiresAt": 1700000001000, "ttl": 1000,
//!       "slidingExpiration": false, "weight": 1, "createdAt": 1700000000000 }
//!   ]
//! }
//! ```
//!
//! Entries are listed least recently used first, so replaying them through
//! `set` rebuilds the same recency order.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, CacheOptions, EntryOptions};

// == Serialized Cache ==
/// Configuration plus entries of one cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCache<K, V> {
    pub capacity: usize,
    pub max_weight: u64,
    /// Housekeeping cadence in milliseconds
    pub purge_interval: u64,
    pub entries: Vec<SerializedEntry<K, V>>,
}

impl<K, V> SerializedCache<K, V> {
    /// Sizing options to rebuild the cache with.
    pub fn options(&self) -> CacheOptions {
        CacheOptions::new(self.capacity)
            .with_max_weight(self.max_weight)
            .with_purge_interval_ms(self.purge_interval)
    }
}

// == Serialized Entry ==
/// One entry in the snapshot.
///
/// `ttl` and `weight` are signed so that hand-edited or foreign snapshots with
/// non-positive values are normalized instead of rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedEntry<K, V> {
    pub key: K,
    pub value: V,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sliding_expiration: Option<bool>,
    #[serde(default = "default_weight")]
    pub weight: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
}

fn default_weight() -> i64 {
    1
}

/// An entry ready to be replayed through `set`.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredEntry<K, V> {
    pub key: K,
    pub value: V,
    pub options: EntryOptions,
    pub created_at: Option<u64>,
}

impl<K: Clone, V: Clone> SerializedEntry<K, V> {
    /// Captures a live entry.
    pub fn from_entry(key: &K, entry: &CacheEntry<V>) -> Self {
        Self {
            key: key.clone(),
            value: entry.value.clone(),
            expires_at: entry.expires_at,
            ttl: entry.ttl_ms.map(|ttl| ttl.min(i64::MAX as u64) as i64),
            sliding_expiration: Some(entry.sliding_expiration),
            weight: entry.weight.min(i64::MAX as u64) as i64,
            created_at: Some(entry.created_at),
        }
    }
}

impl<K, V> SerializedEntry<K, V> {
    // == Restore ==
    /// Converts the record into replayable `set` arguments as seen at `now`.
    ///
    /// Returns `None` when the entry's deadline has already passed. Fixed
    /// entries get the remaining lifetime as their TTL so that time spent at
    /// rest is deducted; sliding entries keep their full TTL.
    pub fn into_restored(self, now: u64) -> Option<RestoredEntry<K, V>> {
        if matches!(self.expires_at, Some(expires) if expires <= now) {
            return None;
        }

        let sliding = self.sliding_expiration.unwrap_or(false);
        let ttl_ms = self.ttl.filter(|&ttl| ttl > 0).map(|ttl| ttl as u64);
        let remaining_ms = self.expires_at.map(|expires| expires - now);

        let restored_ttl = match (sliding, ttl_ms, remaining_ms) {
            (true, Some(ttl), _) => Some(ttl),
            (_, _, Some(remaining)) => Some(remaining),
            (_, ttl, None) => ttl,
        };

        let options = EntryOptions {
            ttl: restored_ttl.map(Duration::from_millis),
            sliding_expiration: sliding,
            weight: self.weight.max(1) as u64,
        };

        Some(RestoredEntry {
            key: self.key,
            value: self.value,
            options,
            created_at: self.created_at,
        })
    }
}

// == Tagged Snapshot ==
/// Factory envelope naming which implementation produced `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedSnapshot {
    #[serde(rename = "type")]
    pub kind: String,
    /// The implementation's own `serialize` output
    pub data: String,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_010_000;

    fn entry(
        expires_at: Option<u64>,
        ttl: Option<i64>,
        sliding: bool,
    ) -> SerializedEntry<String, String> {
        SerializedEntry {
            key: "k".to_string(),
            value: "v".to_string(),
            expires_at,
            ttl,
            sliding_expiration: Some(sliding),
            weight: 2,
            created_at: Some(NOW - 5_000),
        }
    }

    #[test]
    fn test_expired_entry_is_skipped() {
        assert!(entry(Some(NOW - 1), Some(1_000), false).into_restored(NOW).is_none());
        assert!(entry(Some(NOW), Some(1_000), false).into_restored(NOW).is_none());
    }

    #[test]
    fn test_fixed_entry_gets_remaining_ttl() {
        let restored = entry(Some(NOW + 400), Some(5_000), false)
            .into_restored(NOW)
            .unwrap();

        assert_eq!(restored.options.effective_ttl_ms(), Some(400));
        assert!(!restored.options.sliding_expiration);
        assert_eq!(restored.options.weight, 2);
        assert_eq!(restored.created_at, Some(NOW - 5_000));
    }

    #[test]
    fn test_sliding_entry_keeps_full_ttl() {
        let restored = entry(Some(NOW + 400), Some(5_000), true)
            .into_restored(NOW)
            .unwrap();

        assert_eq!(restored.options.effective_ttl_ms(), Some(5_000));
        assert!(restored.options.sliding_expiration);
    }

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let restored = entry(None, None, false).into_restored(NOW).unwrap();
        assert_eq!(restored.options.ttl, None);
    }

    #[test]
    fn test_non_positive_weight_is_normalized() {
        let json = r#"{"key":"k","value":"v","weight":-3}"#;
        let record: SerializedEntry<String, String> = serde_json::from_str(json).unwrap();
        let restored = record.into_restored(NOW).unwrap();
        assert_eq!(restored.options.weight, 1);
    }

    #[test]
    fn test_missing_weight_defaults_to_one() {
        let json = r#"{"key":"k","value":"v"}"#;
        let record: SerializedEntry<String, String> = serde_json::from_str(json).unwrap();
        assert_eq!(record.weight, 1);
    }

    #[test]
    fn test_tagged_snapshot_uses_type_field() {
        let tagged = TaggedSnapshot {
            kind: "linked-list".to_string(),
            data: "{}".to_string(),
        };
        let json = serde_json::to_value(&tagged).unwrap();
        assert_eq!(json["type"], "linked-list");
        assert_eq!(json["data"], "{}");
    }

    #[test]
    fn test_cache_record_field_names() {
        let record: SerializedCache<String, String> = SerializedCache {
            capacity: 3,
            max_weight: 10,
            purge_interval: 500,
            entries: vec![entry(None, None, false)],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["maxWeight"], 10);
        assert_eq!(json["purgeInterval"], 500);
        assert_eq!(json["entries"][0]["slidingExpiration"], false);
        assert!(json["entries"][0].get("expiresAt").is_none());
    }
}
