//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction.

mod entry;
mod key;
mod lru;
mod stats;
mod store;


use std::sync::Arc;

use parking_lot::Mutex;

// Re-export public types
pub use entry::CacheEntry;
pub use key::CacheKey;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Number of entries a client cache holds
pub const DEFAULT_CACHE_CAPACITY: usize = 5000;

/// A cache store shared between concurrent callers.
///
/// Critical sections are short and synchronous; the lock is never held
/// across an `.await`.
pub type SharedCache<V> = Arc<Mutex<CacheStore<V>>>;

/// Wraps a store for sharing.
pub fn shared<V: Clone>(store: CacheStore<V>) -> SharedCache<V> {
    Arc::new(Mutex::new(store))
}
