//! Resilient RPC - a caching, retrying client for Solana-style JSON-RPC nodes
//!
//! Reads go through a TTL + LRU cache and a linear-backoff retry policy;
//! log subscriptions isolate consumer callbacks from the transport.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod tasks;
pub mod transport;

pub use client::{
    BlockRange, CachedValue, FailureReporter, IsolatedFailure, LogSubscription, ResilientClient,
    MAX_BATCH,
};
pub use config::Config;
pub use error::{ClientError, Result, TransportError};
pub use retry::RetryPolicy;
pub use tasks::spawn_cleanup_task;
pub use transport::{HttpTransport, InMemoryTransport, RpcTransport};
