//! Transport Module
//!
//! The boundary to the underlying RPC service. The client only talks to an
//! `RpcTransport`, so tests and offline runs can swap in `InMemoryTransport`.
//!
//! # Implementations
//! - `HttpTransport`: JSON-RPC over HTTP, log subscriptions over WebSocket
//! - `InMemoryTransport`: scriptable in-process node

mod http;
mod memory;
mod pubsub;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::models::{
    AccountInfo, Block, BlockOptions, Commitment, HealthStatus, LogNotification,
    TransactionDetails,
};

pub use http::HttpTransport;
pub use memory::InMemoryTransport;
pub use pubsub::{parse_log_notification, LogsPubsub};

/// Result type for transport calls.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Listener invoked by the transport for each delivered log event.
pub type LogHandler = Arc<dyn Fn(LogNotification) + Send + Sync>;

/// Transport-assigned handle of a log subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// RPC methods a transport serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    GetAccountInfo,
    GetBalance,
    GetBlock,
    GetTransaction,
    GetSlot,
    GetHealth,
}

impl RpcMethod {
    /// JSON-RPC method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::GetAccountInfo => "getAccountInfo",
            RpcMethod::GetBalance => "getBalance",
            RpcMethod::GetBlock => "getBlock",
            RpcMethod::GetTransaction => "getTransaction",
            RpcMethod::GetSlot => "getSlot",
            RpcMethod::GetHealth => "getHealth",
        }
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == RPC Transport ==
/// Capabilities the client needs from the underlying service.
///
/// Implementations perform exactly one network call per method invocation;
/// caching and retrying are the client's job.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn get_account_info(
        &self,
        address: &str,
        commitment: Commitment,
    ) -> TransportResult<Option<AccountInfo>>;

    async fn get_balance(&self, address: &str, commitment: Commitment) -> TransportResult<u64>;

    /// `Ok(None)` when the node has no block for the slot.
    async fn get_block(
        &self,
        slot: u64,
        options: BlockOptions,
        commitment: Commitment,
    ) -> TransportResult<Option<Block>>;

    async fn get_transaction(
        &self,
        signature: &str,
        options: BlockOptions,
        commitment: Commitment,
    ) -> TransportResult<Option<TransactionDetails>>;

    async fn get_slot(&self, commitment: Commitment) -> TransportResult<u64>;

    /// Whether `get_health` is backed by a real health check.
    fn supports_health(&self) -> bool {
        false
    }

    async fn get_health(&self) -> TransportResult<HealthStatus> {
        Err(TransportError::Unsupported(RpcMethod::GetHealth.as_str()))
    }

    /// Registers `handler` for logs mentioning `topic`.
    async fn subscribe_logs(
        &self,
        topic: &str,
        commitment: Commitment,
        handler: LogHandler,
    ) -> TransportResult<SubscriptionId>;

    /// Removes a subscription; unknown ids are an error.
    async fn unsubscribe_logs(&self, id: SubscriptionId) -> TransportResult<()>;
}
