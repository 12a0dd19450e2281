//! TTL Cleanup Task
//!
//! Background task that periodically drops expired read results so the
//! cache does not hold stale entries that are never read again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Spawns a task purging expired entries from `cache` every `interval`.
///
/// The task runs until aborted through the returned handle. The cache lock
/// is held only for the purge itself, never across the sleep.
///
/// # Example
/// ```ignore
/// let client = ResilientClient::connect(&config)?;
/// let cleanup_handle = spawn_cleanup_task(client.cache(), config.cleanup_interval);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(cache: SharedCache<V>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting cache cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let (removed, remaining) = {
                let mut store = cache.lock();
                (store.purge_expired(), store.len())
            };

            if removed > 0 {
                info!(removed, remaining, "Cache cleanup: purged expired entries");
            } else {
                debug!(remaining, "Cache cleanup: nothing expired");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{self, CacheStore};

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = cache::shared(CacheStore::new(100, Duration::from_secs(1)));
        cache.lock().set("balance:addr", 42u64);

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(2500)).await;

        {
            let store = cache.lock();
            assert!(store.is_empty(), "expired entry should have been purged");
            assert_eq!(store.stats().expirations, 1);
        }

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_preserves_live_entries() {
        let cache = cache::shared(CacheStore::new(100, Duration::from_secs(3600)));
        cache.lock().set("slot:10", "block".to_string());

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.lock().get("slot:10"), Some("block".to_string()));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let cache = cache::shared(CacheStore::<u64>::new(100, Duration::from_secs(30)));

        let handle = spawn_cleanup_task(cache, Duration::from_secs(1));
        handle.abort();

        let result = handle.await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
