//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with weight and TTL support.

use crate::cache::options::EntryOptions;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// `expires_at` is present exactly when `ttl_ms` is present.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Cost counted against the cache's weight ceiling (always >= 1)
    pub weight: u64,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Time to live in milliseconds, None = no expiration
    pub ttl_ms: Option<u64>,
    /// Whether a successful read pushes `expires_at` forward
    pub sliding_expiration: bool,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: Option<u64>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stamped at `now`.
    pub fn new(value: V, options: &EntryOptions, now: u64) -> Self {
        let ttl_ms = options.effective_ttl_ms();
        Self {
            value,
            weight: options.effective_weight(),
            created_at: now,
            ttl_ms,
            sliding_expiration: options.sliding_expiration,
            expires_at: ttl_ms.map(|ttl| now.saturating_add(ttl)),
        }
    }

    // == Replace ==
    /// Overwrites value, TTL and weight in place, keeping `created_at`.
    ///
    /// Returns the previous value.
    pub fn replace(&mut self, value: V, options: &EntryOptions, now: u64) -> V {
        let ttl_ms = options.effective_ttl_ms();
        self.weight = options.effective_weight();
        self.ttl_ms = ttl_ms;
        self.sliding_expiration = options.sliding_expiration;
        self.expires_at = ttl_ms.map(|ttl| now.saturating_add(ttl));
        std::mem::replace(&mut self.value, value)
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is still live at exactly `expires_at`; it expires once the
    /// clock has moved strictly past it.
    pub fn is_expired(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }

    // == Touch ==
    /// Pushes `expires_at` forward for sliding entries. No-op otherwise.
    pub fn touch(&mut self, now: u64) {
        if self.sliding_expiration {
            if let Some(ttl) = self.ttl_ms {
                self.expires_at = Some(now.saturating_add(ttl));
            }
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self, now: u64) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(now))
    }
}
