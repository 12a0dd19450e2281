//! In-process transport
//!
//! A scriptable stand-in for a node: seeded data, injected failures, call
//! counters and manual log publishing. Useful for tests and offline runs.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::TransportError;
use crate::models::{
    AccountInfo, Block, BlockOptions, Commitment, HealthStatus, LogNotification,
    TransactionDetails,
};
use crate::transport::{LogHandler, RpcMethod, RpcTransport, SubscriptionId, TransportResult};

#[derive(Default)]
struct NodeState {
    accounts: HashMap<String, AccountInfo>,
    balances: HashMap<String, u64>,
    blocks: HashMap<u64, Block>,
    transactions: HashMap<String, TransactionDetails>,
    slot: u64,
    health: Option<HealthStatus>,
    pending_failures: HashMap<RpcMethod, u32>,
    calls: HashMap<RpcMethod, u32>,
    block_requests: Vec<(u64, BlockOptions)>,
    subscribers: BTreeMap<SubscriptionId, (String, LogHandler)>,
    next_subscription: u64,
    reject_unsubscribe: bool,
}

// == In-Memory Transport ==
/// `RpcTransport` answering from in-memory state.
///
/// Missing accounts, blocks and transactions read as `None`; a missing
/// balance reads as zero. Health is only supported once a status is set.
#[derive(Default)]
pub struct InMemoryTransport {
    state: Mutex<NodeState>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&self, address: &str, info: AccountInfo) {
        self.state.lock().accounts.insert(address.to_string(), info);
    }

    pub fn set_balance(&self, address: &str, lamports: u64) {
        self.state.lock().balances.insert(address.to_string(), lamports);
    }

    pub fn insert_block(&self, slot: u64, block: Block) {
        self.state.lock().blocks.insert(slot, block);
    }

    pub fn insert_transaction(&self, signature: &str, tx: TransactionDetails) {
        self.state
            .lock()
            .transactions
            .insert(signature.to_string(), tx);
    }

    pub fn set_slot(&self, slot: u64) {
        self.state.lock().slot = slot;
    }

    /// `Some` turns on the health capability, `None` removes it.
    pub fn set_health(&self, health: Option<HealthStatus>) {
        self.state.lock().health = health;
    }

    /// Makes the next `times` calls of `method` fail.
    pub fn fail_next(&self, method: RpcMethod, times: u32) {
        *self
            .state
            .lock()
            .pending_failures
            .entry(method)
            .or_insert(0) += times;
    }

    /// Number of calls made to `method`, failed ones included.
    pub fn calls(&self, method: RpcMethod) -> u32 {
        self.state.lock().calls.get(&method).copied().unwrap_or(0)
    }

    /// Every `(slot, options)` pair `get_block` was called with, in order.
    pub fn block_requests(&self) -> Vec<(u64, BlockOptions)> {
        self.state.lock().block_requests.clone()
    }

    /// Makes every later unsubscribe fail.
    pub fn reject_unsubscribe(&self, reject: bool) {
        self.state.lock().reject_unsubscribe = reject;
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.state
            .lock()
            .subscribers
            .values()
            .filter(|(subscribed, _)| subscribed == topic)
            .count()
    }

    /// Delivers `notification` to every listener of `topic`, the way a
    /// transport's dispatch loop would. Returns the number of listeners
    /// called.
    pub fn publish_logs(&self, topic: &str, notification: LogNotification) -> usize {
        let handlers: Vec<LogHandler> = self
            .state
            .lock()
            .subscribers
            .values()
            .filter(|(subscribed, _)| subscribed == topic)
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in &handlers {
            handler(notification.clone());
        }
        handlers.len()
    }

    /// Counts the call and consumes one injected failure, if any.
    fn enter(&self, method: RpcMethod) -> TransportResult<()> {
        let mut state = self.state.lock();
        *state.calls.entry(method).or_insert(0) += 1;

        match state.pending_failures.get_mut(&method) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(TransportError::Other(format!("injected {method} failure")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RpcTransport for InMemoryTransport {
    async fn get_account_info(
        &self,
        address: &str,
        _commitment: Commitment,
    ) -> TransportResult<Option<AccountInfo>> {
        self.enter(RpcMethod::GetAccountInfo)?;
        Ok(self.state.lock().accounts.get(address).cloned())
    }

    async fn get_balance(&self, address: &str, _commitment: Commitment) -> TransportResult<u64> {
        self.enter(RpcMethod::GetBalance)?;
        Ok(self.state.lock().balances.get(address).copied().unwrap_or(0))
    }

    async fn get_block(
        &self,
        slot: u64,
        options: BlockOptions,
        _commitment: Commitment,
    ) -> TransportResult<Option<Block>> {
        self.state.lock().block_requests.push((slot, options));
        self.enter(RpcMethod::GetBlock)?;
        Ok(self.state.lock().blocks.get(&slot).cloned())
    }

    async fn get_transaction(
        &self,
        signature: &str,
        _options: BlockOptions,
        _commitment: Commitment,
    ) -> TransportResult<Option<TransactionDetails>> {
        self.enter(RpcMethod::GetTransaction)?;
        Ok(self.state.lock().transactions.get(signature).cloned())
    }

    async fn get_slot(&self, _commitment: Commitment) -> TransportResult<u64> {
        self.enter(RpcMethod::GetSlot)?;
        Ok(self.state.lock().slot)
    }

    fn supports_health(&self) -> bool {
        self.state.lock().health.is_some()
    }

    async fn get_health(&self) -> TransportResult<HealthStatus> {
        self.enter(RpcMethod::GetHealth)?;
        self.state
            .lock()
            .health
            .clone()
            .ok_or(TransportError::Unsupported(RpcMethod::GetHealth.as_str()))
    }

    async fn subscribe_logs(
        &self,
        topic: &str,
        _commitment: Commitment,
        handler: LogHandler,
    ) -> TransportResult<SubscriptionId> {
        let mut state = self.state.lock();
        state.next_subscription += 1;
        let id = SubscriptionId(state.next_subscription);
        state.subscribers.insert(id, (topic.to_string(), handler));
        Ok(id)
    }

    async fn unsubscribe_logs(&self, id: SubscriptionId) -> TransportResult<()> {
        let mut state = self.state.lock();
        if state.reject_unsubscribe {
            return Err(TransportError::Other(format!("unsubscribe {id} rejected")));
        }
        state
            .subscribers
            .remove(&id)
            .map(|_| ())
            .ok_or(TransportError::UnknownSubscription(id))
    }
}
