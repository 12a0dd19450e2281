//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch stamps the key with a monotonically increasing tick:
/// - `order` maps tick -> key, so the smallest tick is the least recently used
/// - `ticks` maps key -> its current tick, so a re-touch can drop the old stamp
///
/// Touch, remove and eviction are all logarithmic in the number of keys.
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Last tick handed out
    clock: u64,
    /// Current tick per key
    ticks: HashMap<String, u64>,
    /// Keys ordered by access tick (oldest first)
    order: BTreeMap<u64, String>,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as the most recently used.
    pub fn touch(&mut self, key: &str) {
        self.clock += 1;
        let tick = self.clock;

        match self.ticks.get_mut(key) {
            Some(previous) => {
                self.order.remove(previous);
                *previous = tick;
            }
            None => {
                self.ticks.insert(key.to_string(), tick);
            }
        }
        self.order.insert(tick, key.to_string());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.ticks.remove(key) {
            self.order.remove(&tick);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.first_key_value().map(|(_, key)| key.as_str())
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ticks.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(lru: &mut LruTracker) -> Vec<String> {
        std::iter::from_fn(|| lru.evict_oldest()).collect()
    }

    #[test]
    fn test_empty_tracker() {
        let mut lru = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.peek_oldest(), None);
        assert_eq!(lru.evict_oldest(), None);
    }

    #[test]
    fn test_retouch_moves_key_to_newest() {
        let mut lru = LruTracker::new();
        for key in ["block:1", "block:2", "block:3"] {
            lru.touch(key);
        }
        lru.touch("block:1");

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some("block:2"));
        assert_eq!(drain(&mut lru), vec!["block:2", "block:3", "block:1"]);
    }

    #[test]
    fn test_eviction_forgets_key() {
        let mut lru = LruTracker::new();
        lru.touch("balance:a");
        lru.touch("balance:b");

        assert_eq!(lru.evict_oldest().as_deref(), Some("balance:a"));
        assert!(!lru.contains("balance:a"));
        assert!(lru.contains("balance:b"));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_remove_skips_key_in_order() {
        let mut lru = LruTracker::new();
        for key in ["tx:1", "tx:2", "tx:3"] {
            lru.touch(key);
        }
        lru.remove("tx:2");
        lru.remove("tx:unknown");

        assert_eq!(drain(&mut lru), vec!["tx:1", "tx:3"]);
        assert!(lru.is_empty());
    }

    #[test]
    fn test_repeated_touch_tracks_once() {
        let mut lru = LruTracker::new();
        for _ in 0..3 {
            lru.touch("health:v1");
        }
        assert_eq!(lru.len(), 1);
        assert_eq!(drain(&mut lru), vec!["health:v1"]);
    }
}
