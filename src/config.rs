//! Configuration Module
//!
//! Handles loading cache sizing and implementation choice from environment variables.

use std::env;

use tracing::warn;

use crate::cache::{
    create, AnyCache, CacheKey, CacheKind, CacheOptions, CacheValue, DEFAULT_CAPACITY,
    DEFAULT_PURGE_INTERVAL_MS,
};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Maximum aggregate entry weight, None = same as capacity
    pub max_weight: Option<u64>,
    /// Minimum milliseconds between purges triggered from `set`
    pub purge_interval_ms: u64,
    /// Which implementation to build
    pub kind: CacheKind,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum entries (default: 100)
    /// - `CACHE_MAX_WEIGHT` - Maximum aggregate weight (default: capacity)
    /// - `CACHE_PURGE_INTERVAL_MS` - Purge throttle in milliseconds (default: 60000)
    /// - `CACHE_KIND` - `ordered-map` or `linked-list` (default: ordered-map)
    pub fn from_env() -> Self {
        let kind = match env::var("CACHE_KIND") {
            Ok(raw) => raw.parse().unwrap_or_else(|err| {
                warn!(error = %err, "Ignoring CACHE_KIND, using the default implementation");
                CacheKind::default()
            }),
            Err(_) => CacheKind::default(),
        };

        Self {
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CAPACITY),
            max_weight: env::var("CACHE_MAX_WEIGHT")
                .ok()
                .and_then(|v| v.parse().ok()),
            purge_interval_ms: env::var("CACHE_PURGE_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PURGE_INTERVAL_MS),
            kind,
        }
    }

    /// Sizing options for constructing a cache from this configuration.
    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            capacity: self.capacity,
            max_weight: self.max_weight,
            purge_interval_ms: self.purge_interval_ms,
        }
    }

    /// Builds an empty cache of the configured kind.
    pub fn build<K: CacheKey, V: CacheValue>(&self) -> AnyCache<K, V> {
        create(self.kind, self.options())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_weight: None,
            purge_interval_ms: DEFAULT_PURGE_INTERVAL_MS,
            kind: CacheKind::OrderedMap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.max_weight, None);
        assert_eq!(config.purge_interval_ms, 60_000);
        assert_eq!(config.kind, CacheKind::OrderedMap);
    }

    #[test]
    fn test_config_options() {
        let config = CacheConfig {
            capacity: 5,
            max_weight: Some(10),
            purge_interval_ms: 250,
            kind: CacheKind::LinkedList,
        };
        let options = config.options();
        assert_eq!(options.effective_capacity(), 5);
        assert_eq!(options.effective_max_weight(), 10);
        assert_eq!(options.purge_interval_ms, 250);

        let cache = config.build::<String, String>();
        assert_eq!(cache.kind(), CacheKind::LinkedList);
    }

    #[test]
    fn test_config_from_env() {
        // Single test touching the environment so parallel tests cannot race
        env::remove_var("CACHE_CAPACITY");
        env::remove_var("CACHE_MAX_WEIGHT");
        env::remove_var("CACHE_PURGE_INTERVAL_MS");
        env::remove_var("CACHE_KIND");
        assert_eq!(CacheConfig::from_env(), CacheConfig::default());

        env::set_var("CACHE_CAPACITY", "7");
        env::set_var("CACHE_MAX_WEIGHT", "21");
        env::set_var("CACHE_KIND", "linked-list");
        let config = CacheConfig::from_env();
        assert_eq!(config.capacity, 7);
        assert_eq!(config.max_weight, Some(21));
        assert_eq!(config.kind, CacheKind::LinkedList);

        env::set_var("CACHE_KIND", "bogus");
        assert_eq!(CacheConfig::from_env().kind, CacheKind::OrderedMap);

        env::remove_var("CACHE_CAPACITY");
        env::remove_var("CACHE_MAX_WEIGHT");
        env::remove_var("CACHE_KIND");
    }
}
