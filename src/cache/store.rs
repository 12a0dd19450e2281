//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStats, LruTracker};

// == Cache Store ==
/// Bounded key-value storage with LRU eviction and a single TTL for every entry.
///
/// Lookups never fail: anything absent or expired is simply `None`.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Lifetime of every entry, counted from its last write
    ttl: Duration,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with the given capacity and entry TTL.
    ///
    /// A capacity of zero is raised to one so that a fresh write is always
    /// readable.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    // == Set ==
    /// Stores a value, overwriting any previous entry and resetting its expiry.
    ///
    /// If the key is new and the cache is at capacity, the least recently
    /// used entry is evicted first.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            if let Some(evicted_key) = self.lru.evict_oldest() {
                self.entries.remove(&evicted_key);
                self.stats.record_eviction();
            }
        }

        self.entries
            .insert(key.clone(), CacheEntry::new(value, self.ttl));
        self.lru.touch(&key);

        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// A hit marks the key as most recently used. An expired entry is
    /// dropped on the spot and counted as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.lru.remove(key);
            self.stats.record_expirations(1);
            self.stats.set_total_entries(self.entries.len());
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        self.lru.touch(key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Purge Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        let count = expired_keys.len();
        self.stats.record_expirations(count);
        self.stats.set_total_entries(self.entries.len());
        count
    }

    /// Returns the number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(30);

    #[test]
    fn test_store_new() {
        let store: CacheStore<String> = CacheStore::new(100, TTL);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
        assert_eq!(store.ttl(), TTL);
    }

    #[test]
    fn test_store_zero_capacity_is_raised() {
        let mut store = CacheStore::new(0, TTL);
        store.set("balance:a", 1u64);
        assert_eq!(store.get("balance:a"), Some(1));
        assert_eq!(store.capacity(), 1);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new(100, TTL);

        store.set("balance:addr", 5_000u64);

        assert_eq!(store.get("balance:addr"), Some(5_000));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store: CacheStore<u64> = CacheStore::new(100, TTL);
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_store_caches_none_as_a_value() {
        let mut store: CacheStore<Option<u64>> = CacheStore::new(100, TTL);

        store.set("block:12", None);

        // A stored "no data" result is a hit, distinct from a miss
        assert_eq!(store.get("block:12"), Some(None));
        assert_eq!(store.get("block:13"), None);
        assert_eq!(store.stats().hits, 1);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new(100, TTL);

        store.set("key1", "value1".to_string());
        store.set("key1", "value2".to_string());

        assert_eq!(store.get("key1"), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_ttl_expiration() {
        let mut store = CacheStore::new(100, Duration::from_secs(1));

        store.set("key1", 1u8);
        assert_eq!(store.get("key1"), Some(1));

        tokio::time::advance(Duration::from_millis(1100)).await;

        assert_eq!(store.get("key1"), None);
        assert_eq!(store.len(), 0);
        assert_eq!(store.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_overwrite_resets_expiry() {
        let mut store = CacheStore::new(100, Duration::from_secs(10));

        store.set("key1", 1u8);
        tokio::time::advance(Duration::from_secs(8)).await;
        store.set("key1", 2u8);
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(store.get("key1"), Some(2));
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = CacheStore::new(3, TTL);

        store.set("key1", 1);
        store.set("key2", 2);
        store.set("key3", 3);

        // Cache is full, adding key4 evicts key1 (oldest)
        store.set("key4", 4);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("key1"), None);
        assert_eq!(store.get("key2"), Some(2));
        assert_eq!(store.get("key3"), Some(3));
        assert_eq!(store.get("key4"), Some(4));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = CacheStore::new(3, TTL);

        store.set("key1", 1);
        store.set("key2", 2);
        store.set("key3", 3);

        // Reading key1 makes it the most recently used
        store.get("key1");

        store.set("key4", 4);

        assert_eq!(store.get("key1"), Some(1));
        assert_eq!(store.get("key2"), None);
    }

    #[test]
    fn test_store_overwrite_at_capacity_does_not_evict() {
        let mut store = CacheStore::new(2, TTL);

        store.set("key1", 1);
        store.set("key2", 2);
        store.set("key1", 10);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("key2"), Some(2));
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::new(100, TTL);

        store.set("key1", "value1");
        store.get("key1"); // hit
        store.get("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_purge_expired() {
        let mut store = CacheStore::new(100, Duration::from_secs(1));

        store.set("key1", 1);
        tokio::time::advance(Duration::from_millis(600)).await;
        store.set("key2", 2);
        tokio::time::advance(Duration::from_millis(600)).await;

        let removed = store.purge_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("key2"), Some(2));
    }
}
