//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the bounds, statistics and recency guarantees of
//! both implementations, and that the two behave identically.

use proptest::prelude::*;
use std::collections::HashSet;

use crate::cache::{
    create_with_clock, deserialize_with_clock, serialize, AnyCache, CacheKind, CacheOptions,
    EntryOptions, LruCache, ManualClock,
};

// == Test Configuration ==
const T0: u64 = 1_700_000_000_000;
const KINDS: [CacheKind; 2] = [CacheKind::OrderedMap, CacheKind::LinkedList];

// == Strategies ==
/// Small key space so that operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,32}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String, ttl_ms: u64, sliding: bool },
    Get { key: String },
    Has { key: String },
    Delete { key: String },
    Advance { ms: u64 },
    Purge,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), value_strategy(), prop_oneof![Just(0u64), 1u64..500], any::<bool>())
            .prop_map(|(key, value, ttl_ms, sliding)| CacheOp::Set { key, value, ttl_ms, sliding }),
        3 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Has { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
        1 => (1u64..300).prop_map(|ms| CacheOp::Advance { ms }),
        1 => Just(CacheOp::Purge),
    ]
}

/// Weight is a function of the key so overwrites never change it.
fn weight_of(key: &str) -> u64 {
    key.bytes().map(u64::from).sum::<u64>() % 4 + 1
}

/// Rescales times so a deadline never lands exactly on the clock reading:
/// deadlines end in 5 ms, the clock only moves in steps of 10 ms.
fn off_grid(op: &CacheOp) -> CacheOp {
    match op {
        CacheOp::Set { key, value, ttl_ms, sliding } if *ttl_ms > 0 => CacheOp::Set {
            key: key.clone(),
            value: value.clone(),
            ttl_ms: ttl_ms * 10 + 5,
            sliding: *sliding,
        },
        CacheOp::Advance { ms } => CacheOp::Advance { ms: ms * 10 },
        other => other.clone(),
    }
}

fn build(kind: CacheKind, options: CacheOptions) -> (AnyCache<String, String>, ManualClock) {
    let clock = ManualClock::new(T0);
    (create_with_clock(kind, options, clock.clone()), clock)
}

/// Applies one operation, returning what a caller would observe.
fn apply(cache: &mut AnyCache<String, String>, clock: &ManualClock, op: &CacheOp) -> String {
    match op {
        CacheOp::Set { key, value, ttl_ms, sliding } => {
            let options = EntryOptions::new()
                .with_ttl_ms(*ttl_ms)
                .with_sliding_expiration(*sliding)
                .with_weight(weight_of(key));
            cache.set(key.clone(), value.clone(), options);
            String::new()
        }
        CacheOp::Get { key } => format!("{:?}", cache.get(key.as_str())),
        CacheOp::Has { key } => cache.has(key.as_str()).to_string(),
        CacheOp::Delete { key } => cache.delete(key.as_str()).to_string(),
        CacheOp::Advance { ms } => {
            clock.advance(*ms);
            String::new()
        }
        CacheOp::Purge => cache.purge_expired().to_string(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Both implementations must be observably identical for any operation sequence.
    #[test]
    fn prop_implementations_agree(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let options = CacheOptions::new(5).with_max_weight(9).with_purge_interval_ms(400);
        let (mut ordered, ordered_clock) = build(CacheKind::OrderedMap, options);
        let (mut linked, linked_clock) = build(CacheKind::LinkedList, options);

        for op in &ops {
            let left = apply(&mut ordered, &ordered_clock, op);
            let right = apply(&mut linked, &linked_clock, op);
            prop_assert_eq!(left, right, "Diverged on {:?}", op);
            prop_assert_eq!(ordered.entries(), linked.entries());
            prop_assert_eq!(ordered.total_weight(), linked.total_weight());
        }

        prop_assert_eq!(ordered.stats(), linked.stats());
    }

    // Count and weight ceilings hold after every operation.
    #[test]
    fn prop_capacity_and_weight_bounds(ops in prop::collection::vec(cache_op_strategy(), 1..120)) {
        for kind in KINDS {
            let (mut cache, clock) = build(kind, CacheOptions::new(4).with_max_weight(10));

            for op in &ops {
                apply(&mut cache, &clock, op);
                prop_assert!(cache.size() <= 4, "size {} over capacity", cache.size());
                prop_assert!(
                    cache.total_weight() <= 10,
                    "weight {} over ceiling",
                    cache.total_weight()
                );
                let summed: u64 = cache
                    .entries()
                    .iter()
                    .map(|(key, _)| weight_of(key))
                    .sum();
                prop_assert!(summed <= cache.total_weight());
            }
        }
    }

    // Hits and misses match what `get` returned.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        for kind in KINDS {
            let (mut cache, clock) = build(kind, CacheOptions::new(6).with_max_weight(24));
            let mut expected_hits = 0u64;
            let mut expected_misses = 0u64;

            for op in &ops {
                let observed = apply(&mut cache, &clock, op);
                if let CacheOp::Get { .. } = op {
                    if observed == "None" {
                        expected_misses += 1;
                    } else {
                        expected_hits += 1;
                    }
                }
            }

            let stats = cache.stats();
            prop_assert_eq!(stats.hits, expected_hits);
            prop_assert_eq!(stats.misses, expected_misses);
            prop_assert_eq!(stats.total_entries, cache.size());
        }
    }

    // A snapshot restores the same live entries in the same order, across kinds.
    #[test]
    fn prop_snapshot_round_trip(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        for source in KINDS {
            let (mut cache, clock) = build(source, CacheOptions::new(6).with_max_weight(24));
            for op in &ops {
                apply(&mut cache, &clock, &off_grid(op));
            }

            for target in KINDS {
                let tagged = serialize(&cache, target);
                let restored: AnyCache<String, String> =
                    deserialize_with_clock(&tagged, clock.clone());

                prop_assert_eq!(restored.kind(), target);
                prop_assert_eq!(restored.entries(), cache.entries());
                prop_assert_eq!(restored.capacity(), cache.capacity());
                prop_assert_eq!(restored.max_weight(), cache.max_weight());
            }
        }
    }

    // Filling to capacity and adding one more evicts exactly the first key.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::vec("[a-z]{1,8}", 2..10),
        new_key in "[A-Z]{1,8}",
    ) {
        let unique_keys: Vec<String> = {
            let mut seen = HashSet::new();
            initial_keys.into_iter().filter(|key| seen.insert(key.clone())).collect()
        };
        prop_assume!(unique_keys.len() >= 2);

        for kind in KINDS {
            let (mut cache, _) = build(kind, CacheOptions::new(unique_keys.len()));
            for key in &unique_keys {
                cache.set(key.clone(), format!("value_{}", key), EntryOptions::new());
            }

            cache.set(new_key.clone(), "new".to_string(), EntryOptions::new());

            prop_assert_eq!(cache.size(), unique_keys.len());
            prop_assert!(!cache.has(unique_keys[0].as_str()), "Oldest key should be evicted");
            prop_assert!(cache.has(new_key.as_str()));
            for key in unique_keys.iter().skip(1) {
                prop_assert!(cache.has(key.as_str()), "Key '{}' should survive", key);
            }
        }
    }

    // A key read just before the insertion is protected; the next oldest goes.
    #[test]
    fn prop_lru_access_tracking(
        initial_keys in prop::collection::vec("[a-z]{1,8}", 3..8),
        new_key in "[A-Z]{1,8}",
    ) {
        let unique_keys: Vec<String> = {
            let mut seen = HashSet::new();
            initial_keys.into_iter().filter(|key| seen.insert(key.clone())).collect()
        };
        prop_assume!(unique_keys.len() >= 3);

        for kind in KINDS {
            let (mut cache, _) = build(kind, CacheOptions::new(unique_keys.len()));
            for key in &unique_keys {
                cache.set(key.clone(), format!("value_{}", key), EntryOptions::new());
            }

            prop_assert!(cache.get(unique_keys[0].as_str()).is_some());
            cache.set(new_key.clone(), "new".to_string(), EntryOptions::new());

            prop_assert!(cache.has(unique_keys[0].as_str()), "Accessed key should survive");
            prop_assert!(!cache.has(unique_keys[1].as_str()), "Next oldest should be evicted");
        }
    }
}
