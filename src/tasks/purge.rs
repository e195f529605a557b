//! Expired Entry Purge Task
//!
//! Background task that periodically removes expired cache entries, for hosts
//! that need a guaranteed cleanup cadence on top of the throttled purge that
//! runs inside `set`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheKey, CacheValue, LruCache};

/// Spawns a task that calls `purge_expired` on `cache` every `interval`.
///
/// The cache is shared behind a tokio `Mutex`, which the task holds only for
/// the duration of one purge.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(Mutex::new(create::<String, String>(CacheKind::LinkedList, options)));
/// let purge_handle = spawn_purge_task(cache.clone(), Duration::from_secs(30));
/// // Later, during shutdown:
/// purge_handle.abort();
/// ```
pub fn spawn_purge_task<K, V, C>(cache: Arc<Mutex<C>>, interval: Duration) -> JoinHandle<()>
where
    K: CacheKey,
    V: CacheValue,
    C: LruCache<K, V> + Send + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting cache purge task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut guard = cache.lock().await;
                guard.purge_expired()
            };

            if removed > 0 {
                info!("Cache purge: removed {} expired entries", removed);
            } else {
                debug!("Cache purge: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{
        create_with_clock, AnyCache, CacheKind, CacheOptions, EntryOptions, ManualClock,
    };

    const T0: u64 = 1_700_000_000_000;

    fn shared_cache(clock: &ManualClock) -> Arc<Mutex<AnyCache<String, String>>> {
        // Purge interval far in the future so only the task purges
        let options = CacheOptions::new(16).with_purge_interval_ms(u64::MAX);
        Arc::new(Mutex::new(create_with_clock(
            CacheKind::LinkedList,
            options,
            clock.clone(),
        )))
    }

    #[tokio::test]
    async fn test_purge_task_removes_expired_entries() {
        let clock = ManualClock::new(T0);
        let cache = shared_cache(&clock);
        {
            let mut guard = cache.lock().await;
            guard.set(
                "expire_soon".to_string(),
                "value".to_string(),
                EntryOptions::new().with_ttl_ms(100),
            );
            guard.set("forever".to_string(), "value".to_string(), EntryOptions::new());
        }

        clock.advance(200);
        let handle = spawn_purge_task(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;

        {
            let guard = cache.lock().await;
            assert_eq!(guard.size(), 1, "Expired entry should have been purged");
            assert!(guard.peek("forever").is_some());
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_preserves_live_entries() {
        let clock = ManualClock::new(T0);
        let cache = shared_cache(&clock);
        cache.lock().await.set(
            "long_lived".to_string(),
            "value".to_string(),
            EntryOptions::new().with_ttl_ms(3_600_000),
        );

        let handle = spawn_purge_task(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            cache.lock().await.get("long_lived"),
            Some("value".to_string())
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_can_be_aborted() {
        let clock = ManualClock::new(T0);
        let handle = spawn_purge_task(shared_cache(&clock), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
