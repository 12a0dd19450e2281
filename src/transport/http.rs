//! JSON-RPC over HTTP
//!
//! Issues one JSON-RPC 2.0 POST per call and delegates log subscriptions
//! to a `LogsPubsub` on the node's WebSocket endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::TransportError;
use crate::models::{
    AccountInfo, Block, BlockOptions, Commitment, HealthStatus, TransactionDetails,
};
use crate::transport::{
    LogHandler, LogsPubsub, RpcMethod, RpcTransport, SubscriptionId, TransportResult,
};

/// Slot was skipped or its block is missing.
pub const SLOT_SKIPPED: i64 = -32007;
/// Slot is absent from long-term storage.
pub const LONG_TERM_STORAGE_SLOT_SKIPPED: i64 = -32009;
/// Node is unhealthy or behind; `getHealth` reports this as an error object.
pub const NODE_UNHEALTHY: i64 = -32005;

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Wrapper the node puts around `getAccountInfo` and `getBalance` results.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

// == HTTP Transport ==
/// `RpcTransport` backed by a JSON-RPC HTTP endpoint.
#[derive(Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    rpc_url: String,
    request_id: AtomicU64,
    pubsub: LogsPubsub,
}

impl HttpTransport {
    /// Builds a transport for the configured RPC and WebSocket endpoints.
    pub fn from_config(config: &Config) -> TransportResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self::with_client(http, &config.rpc_url, config.websocket_url()))
    }

    pub fn with_client(
        http: reqwest::Client,
        rpc_url: impl Into<String>,
        ws_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            rpc_url: rpc_url.into(),
            request_id: AtomicU64::new(1),
            pubsub: LogsPubsub::new(ws_url),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn pubsub(&self) -> &LogsPubsub {
        &self.pubsub
    }

    /// Sends one JSON-RPC request and decodes its `result`.
    async fn call<T: DeserializeOwned>(&self, method: RpcMethod, params: Value) -> TransportResult<T> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method.as_str(),
            "params": params,
        });

        debug!(id, %method, "Sending RPC request");
        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(TransportError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(serde_json::from_value(response.result)?)
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn get_account_info(
        &self,
        address: &str,
        commitment: Commitment,
    ) -> TransportResult<Option<AccountInfo>> {
        let params = json!([address, { "commitment": commitment, "encoding": "base64" }]);
        let wrapped: WithContext<Option<AccountInfo>> =
            self.call(RpcMethod::GetAccountInfo, params).await?;
        Ok(wrapped.value)
    }

    async fn get_balance(&self, address: &str, commitment: Commitment) -> TransportResult<u64> {
        let params = json!([address, { "commitment": commitment }]);
        let wrapped: WithContext<u64> = self.call(RpcMethod::GetBalance, params).await?;
        Ok(wrapped.value)
    }

    async fn get_block(
        &self,
        slot: u64,
        options: BlockOptions,
        commitment: Commitment,
    ) -> TransportResult<Option<Block>> {
        let mut config = json!({
            "commitment": commitment,
            "encoding": "json",
            "transactionDetails": "full",
            "rewards": false,
        });
        if let Some(version) = options.max_supported_transaction_version {
            config["maxSupportedTransactionVersion"] = json!(version);
        }

        match self.call(RpcMethod::GetBlock, json!([slot, config])).await {
            Err(TransportError::Rpc { code, message })
                if code == SLOT_SKIPPED || code == LONG_TERM_STORAGE_SLOT_SKIPPED =>
            {
                debug!(slot, code, %message, "No block for slot");
                Ok(None)
            }
            other => other,
        }
    }

    async fn get_transaction(
        &self,
        signature: &str,
        options: BlockOptions,
        commitment: Commitment,
    ) -> TransportResult<Option<TransactionDetails>> {
        let mut config = json!({ "commitment": commitment, "encoding": "json" });
        if let Some(version) = options.max_supported_transaction_version {
            config["maxSupportedTransactionVersion"] = json!(version);
        }

        self.call(RpcMethod::GetTransaction, json!([signature, config]))
            .await
    }

    async fn get_slot(&self, commitment: Commitment) -> TransportResult<u64> {
        self.call(RpcMethod::GetSlot, json!([{ "commitment": commitment }]))
            .await
    }

    fn supports_health(&self) -> bool {
        true
    }

    async fn get_health(&self) -> TransportResult<HealthStatus> {
        match self.call::<String>(RpcMethod::GetHealth, json!([])).await {
            Ok(report) => Ok(HealthStatus::from_report(&report)),
            Err(TransportError::Rpc { code, message }) if code == NODE_UNHEALTHY => {
                debug!(code, %message, "Node reported unhealthy");
                Ok(HealthStatus::Status(message))
            }
            Err(err) => Err(err),
        }
    }

    async fn subscribe_logs(
        &self,
        topic: &str,
        commitment: Commitment,
        handler: LogHandler,
    ) -> TransportResult<SubscriptionId> {
        self.pubsub.subscribe(topic, commitment, handler).await
    }

    async fn unsubscribe_logs(&self, id: SubscriptionId) -> TransportResult<()> {
        self.pubsub.unsubscribe(id)
    }
}
