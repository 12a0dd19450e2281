//! Cached, retried single reads.

use std::sync::Arc;

use crate::cache::CacheKey;
use crate::client::ResilientClient;
use crate::error::Result;
use crate::models::{AccountInfo, Block, BlockOptions, HealthStatus, TransactionDetails};

impl ResilientClient {
    /// Account state for `address`, `None` if the account does not exist.
    pub async fn get_account_info(&self, address: &str) -> Result<Option<AccountInfo>> {
        let transport = &self.transport;
        let commitment = self.commitment;

        self.cached_read(CacheKey::account_info(address), || {
            transport.get_account_info(address, commitment)
        })
        .await
    }

    /// Balance of `address` in lamports.
    pub async fn get_balance(&self, address: &str) -> Result<u64> {
        let transport = &self.transport;
        let commitment = self.commitment;

        self.cached_read(CacheKey::balance(address), || {
            transport.get_balance(address, commitment)
        })
        .await
    }

    /// Block at `slot`, `None` if the node has none.
    ///
    /// `options` are forwarded as given but are not part of the cache key:
    /// a second read of the same slot within the TTL returns the first
    /// result whatever options it asked for.
    pub async fn get_block(&self, slot: u64, options: BlockOptions) -> Result<Option<Arc<Block>>> {
        let transport = &self.transport;
        let commitment = self.commitment;

        self.cached_read(CacheKey::block(slot), || async move {
            transport
                .get_block(slot, options, commitment)
                .await
                .map(|block| block.map(Arc::new))
        })
        .await
    }

    /// Node health.
    ///
    /// Uses the transport's health check when it has one. Otherwise a
    /// current-slot query stands in: a non-zero slot reads as `Ok`, slot 0
    /// as `Unknown`. Either probe runs inside the same retried operation.
    pub async fn get_health(&self) -> Result<HealthStatus> {
        let transport = &self.transport;
        let commitment = self.commitment;

        self.cached_read(CacheKey::health(), || async move {
            if transport.supports_health() {
                return transport.get_health().await;
            }
            let slot = transport.get_slot(commitment).await?;
            Ok(if slot > 0 {
                HealthStatus::Ok
            } else {
                HealthStatus::Unknown
            })
        })
        .await
    }

    /// Transaction by signature, `None` if the node does not know it.
    pub async fn get_transaction(&self, signature: &str) -> Result<Option<Arc<TransactionDetails>>> {
        let transport = &self.transport;
        let commitment = self.commitment;

        self.cached_read(CacheKey::transaction(signature), || async move {
            transport
                .get_transaction(signature, BlockOptions::default(), commitment)
                .await
                .map(|tx| tx.map(Arc::new))
        })
        .await
    }

    /// Current slot. Retried but never cached.
    pub async fn get_slot(&self) -> Result<u64> {
        let slot = self
            .retry
            .execute(|| self.transport.get_slot(self.commitment))
            .await?;
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::{ClientError, TransportError};
    use crate::transport::{InMemoryTransport, RpcMethod};
    use std::time::Duration;

    fn setup() -> (Arc<InMemoryTransport>, ResilientClient) {
        let transport = Arc::new(InMemoryTransport::new());
        let client = ResilientClient::new(&Config::new("memory://node"), transport.clone()).unwrap();
        (transport, client)
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_is_cached_until_ttl() {
        let (transport, client) = setup();
        transport.set_balance("addr", 42);

        assert_eq!(client.get_balance("addr").await.unwrap(), 42);
        transport.set_balance("addr", 43);
        assert_eq!(client.get_balance("addr").await.unwrap(), 42);
        assert_eq!(transport.calls(RpcMethod::GetBalance), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(client.get_balance("addr").await.unwrap(), 43);
        assert_eq!(transport.calls(RpcMethod::GetBalance), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_account_is_cached() {
        let (transport, client) = setup();

        assert_eq!(client.get_account_info("ghost").await.unwrap(), None);
        assert_eq!(client.get_account_info("ghost").await.unwrap(), None);
        assert_eq!(transport.calls(RpcMethod::GetAccountInfo), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_uses_capability_when_present() {
        let (transport, client) = setup();
        transport.set_health(Some(HealthStatus::Status("behind".to_string())));

        let health = client.get_health().await.unwrap();
        assert_eq!(health.to_string(), "behind");
        assert_eq!(transport.calls(RpcMethod::GetHealth), 1);
        assert_eq!(transport.calls(RpcMethod::GetSlot), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_falls_back_to_slot() {
        let (transport, client) = setup();
        transport.set_slot(0);

        assert_eq!(client.get_health().await.unwrap(), HealthStatus::Unknown);
        assert_eq!(transport.calls(RpcMethod::GetSlot), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_fallback_is_retried_in_one_cycle() {
        let (transport, client) = setup();
        transport.set_slot(250_000_000);
        transport.fail_next(RpcMethod::GetSlot, 2);

        assert_eq!(client.get_health().await.unwrap(), HealthStatus::Ok);
        assert_eq!(transport.calls(RpcMethod::GetSlot), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_is_not_cached() {
        let (transport, client) = setup();
        transport.set_slot(10);
        assert_eq!(client.get_slot().await.unwrap(), 10);
        transport.set_slot(11);
        assert_eq!(client.get_slot().await.unwrap(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_read_is_not_cached() {
        let (transport, client) = setup();
        transport.set_balance("addr", 5);
        transport.fail_next(RpcMethod::GetBalance, 4);

        let err = client.get_balance("addr").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(TransportError::Other(_))));

        assert_eq!(client.get_balance("addr").await.unwrap(), 5);
        assert_eq!(transport.calls(RpcMethod::GetBalance), 5);
    }
}
