//! Options Module
//!
//! Per-entry write options and per-cache sizing options.

use std::time::Duration;

// == Defaults ==
/// Entry-count ceiling used when none is given
pub const DEFAULT_CAPACITY: usize = 100;

/// Housekeeping cadence for the opportunistic purge inside `set`, in milliseconds
pub const DEFAULT_PURGE_INTERVAL_MS: u64 = 60_000;

// == Entry Options ==
/// Options applied by a single `set` call.
///
/// Non-positive values are normalized rather than rejected: a zero TTL means
/// "never expires" and a zero weight counts as 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryOptions {
    /// Time to live, `None` or zero = no expiration
    pub ttl: Option<Duration>,
    /// Refresh the TTL on every successful `get`
    pub sliding_expiration: bool,
    /// Cost counted against `max_weight`, zero is treated as 1
    pub weight: u64,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_ttl_ms(self, ttl_ms: u64) -> Self {
        self.with_ttl(Duration::from_millis(ttl_ms))
    }

    pub fn with_sliding_expiration(mut self, sliding: bool) -> Self {
        self.sliding_expiration = sliding;
        self
    }

    pub fn with_weight(mut self, weight: u64) -> Self {
        self.weight = weight;
        self
    }

    /// TTL in milliseconds, or `None` when absent or zero.
    pub fn effective_ttl_ms(&self) -> Option<u64> {
        self.ttl
            .map(|ttl| ttl.as_millis().min(u64::MAX as u128) as u64)
            .filter(|&ms| ms > 0)
    }

    /// Weight with the zero case mapped to the default of 1.
    pub fn effective_weight(&self) -> u64 {
        self.weight.max(1)
    }
}

// == Cache Options ==
/// Sizing and housekeeping parameters for one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum number of live entries (at least 1)
    pub capacity: usize,
    /// Maximum aggregate weight, defaults to `capacity`
    pub max_weight: Option<u64>,
    /// Minimum time between opportunistic purges run from `set`
    pub purge_interval_ms: u64,
}

impl CacheOptions {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn with_max_weight(mut self, max_weight: u64) -> Self {
        self.max_weight = Some(max_weight);
        self
    }

    pub fn with_purge_interval_ms(mut self, purge_interval_ms: u64) -> Self {
        self.purge_interval_ms = purge_interval_ms;
        self
    }

    /// Capacity clamped to the minimum of one entry.
    pub fn effective_capacity(&self) -> usize {
        self.capacity.max(1)
    }

    /// Weight ceiling, falling back to the capacity when unset or zero.
    pub fn effective_max_weight(&self) -> u64 {
        self.max_weight
            .filter(|&w| w > 0)
            .unwrap_or(self.effective_capacity() as u64)
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_weight: None,
            purge_interval_ms: DEFAULT_PURGE_INTERVAL_MS,
        }
    }
}
