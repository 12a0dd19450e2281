//! Client Module
//!
//! The resilient RPC client: cached and retried reads, windowed block
//! batches and isolated log subscriptions over an injected transport.
//!
//! # Operations
//! - `get_account_info`, `get_balance`, `get_block`, `get_health`,
//!   `get_transaction` - cache, then retried transport call
//! - `get_slot` - retried, never cached
//! - `get_blocks` - sequential `get_block` over a bounded range
//! - `subscribe_logs` - callback registration returning a disposer

mod batch;
mod reads;
mod subscriptions;

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{self, CacheKey, CacheStats, CacheStore, SharedCache};
use crate::config::Config;
use crate::error::{Result, TransportError};
use crate::models::{AccountInfo, Block, Commitment, HealthStatus, TransactionDetails};
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, RpcTransport};

pub use batch::{BlockRange, MAX_BATCH};
pub use subscriptions::{log_failure, FailureReporter, IsolatedFailure, LogSubscription};

// == Cached Value ==
/// One cached read result, tagged by operation.
///
/// `None` payloads are real values: a block known to be missing stays cached
/// for the TTL like any other result.
#[derive(Debug, Clone)]
pub enum CachedValue {
    AccountInfo(Option<AccountInfo>),
    Balance(u64),
    Block(Option<Arc<Block>>),
    Health(HealthStatus),
    Transaction(Option<Arc<TransactionDetails>>),
}

/// Conversion between an operation's result and its `CachedValue` variant.
trait Cached: Clone + Sized {
    fn into_cached(self) -> CachedValue;
    fn from_cached(value: CachedValue) -> Option<Self>;
}

impl Cached for Option<AccountInfo> {
    fn into_cached(self) -> CachedValue {
        CachedValue::AccountInfo(self)
    }

    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::AccountInfo(info) => Some(info),
            _ => None,
        }
    }
}

impl Cached for u64 {
    fn into_cached(self) -> CachedValue {
        CachedValue::Balance(self)
    }

    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Balance(lamports) => Some(lamports),
            _ => None,
        }
    }
}

impl Cached for Option<Arc<Block>> {
    fn into_cached(self) -> CachedValue {
        CachedValue::Block(self)
    }

    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Block(block) => Some(block),
            _ => None,
        }
    }
}

impl Cached for HealthStatus {
    fn into_cached(self) -> CachedValue {
        CachedValue::Health(self)
    }

    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Health(status) => Some(status),
            _ => None,
        }
    }
}

impl Cached for Option<Arc<TransactionDetails>> {
    fn into_cached(self) -> CachedValue {
        CachedValue::Transaction(self)
    }

    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Transaction(tx) => Some(tx),
            _ => None,
        }
    }
}

// == Resilient Client ==
/// Caching, retrying front for an `RpcTransport`.
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
pub struct ResilientClient {
    transport: Arc<dyn RpcTransport>,
    cache: SharedCache<CachedValue>,
    retry: RetryPolicy,
    commitment: Commitment,
    reporter: FailureReporter,
}

impl ResilientClient {
    /// Creates a client over `transport`.
    pub fn new(config: &Config, transport: Arc<dyn RpcTransport>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            transport,
            cache: cache::shared(CacheStore::new(config.cache_capacity, config.cache_ttl)),
            retry: RetryPolicy::new(config.retry_attempts, config.retry_base_delay),
            commitment: config.commitment,
            reporter: Arc::new(log_failure),
        })
    }

    /// Creates a client talking JSON-RPC to `config.rpc_url`.
    pub fn connect(config: &Config) -> Result<Self> {
        let transport = HttpTransport::from_config(config)?;
        Self::new(config, Arc::new(transport))
    }

    /// Replaces the hook that receives callback and disposal failures.
    pub fn with_failure_reporter(mut self, reporter: FailureReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn transport(&self) -> &Arc<dyn RpcTransport> {
        &self.transport
    }

    /// Shared handle to the read cache, e.g. for a purge task.
    pub fn cache(&self) -> SharedCache<CachedValue> {
        self.cache.clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    /// Answers from the cache, or runs `fetch` under the retry policy and
    /// caches whatever it returns.
    async fn cached_read<T, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T>
    where
        T: Cached,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, TransportError>>,
    {
        let hit = self.cache.lock().get(key.as_str()).and_then(T::from_cached);
        if let Some(value) = hit {
            debug!(%key, "Cache hit");
            return Ok(value);
        }

        debug!(%key, "Cache miss");
        let value = self.retry.execute(fetch).await?;
        self.cache.lock().set(key, value.clone().into_cached());
        Ok(value)
    }
}
