//! Response models
//!
//! Typed results of the read operations, decoded from the node's JSON.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Converts lamports to SOL for display.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Account state as returned by `getAccountInfo` with base64 encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: String,
    pub executable: bool,
    #[serde(default)]
    pub rent_epoch: u64,
    /// `[payload, encoding]` pair
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub space: Option<u64>,
}

impl AccountInfo {
    /// Length of the encoded data payload, if any.
    pub fn encoded_data_len(&self) -> usize {
        self.data.first().map(String::len).unwrap_or(0)
    }
}

/// A confirmed block.
///
/// Transactions are kept as raw JSON since their shape depends on the
/// requested encoding and transaction version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub blockhash: String,
    pub previous_blockhash: String,
    pub parent_slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub transactions: Vec<Value>,
}

impl Block {
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn block_time_utc(&self) -> Option<DateTime<Utc>> {
        self.block_time
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    /// First account key found in the block's transaction messages.
    ///
    /// Handles both plain string keys and `{ "pubkey": ... }` objects.
    pub fn first_account_key(&self) -> Option<String> {
        self.transactions
            .iter()
            .find_map(|tx| first_account_key(tx.get("transaction")?))
    }

    /// First signature of every transaction in the block.
    pub fn signatures(&self) -> Vec<String> {
        self.transactions
            .iter()
            .filter_map(|tx| tx.pointer("/transaction/signatures/0")?.as_str())
            .map(str::to_string)
            .collect()
    }
}

/// `message.accountKeys[0]` of an encoded transaction, as a plain string
/// key or a parsed `{ "pubkey": ... }` object.
fn first_account_key(transaction: &Value) -> Option<String> {
    match transaction.pointer("/message/accountKeys/0")? {
        Value::String(key) => Some(key.clone()),
        Value::Object(map) => map.get("pubkey")?.as_str().map(str::to_string),
        _ => None,
    }
}

/// A confirmed transaction as returned by `getTransaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub meta: Option<Value>,
    pub transaction: Value,
    #[serde(default)]
    pub version: Option<Value>,
}

impl TransactionDetails {
    /// Fee payer: the first account key of the transaction message.
    pub fn first_account_key(&self) -> Option<String> {
        first_account_key(&self.transaction)
    }
}

/// Result of the health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Node reported healthy, or answered a slot query
    Ok,
    /// Slot query answered with slot 0
    Unknown,
    /// Any other status string the node reported
    Status(String),
}

impl HealthStatus {
    pub fn from_report(report: &str) -> Self {
        match report {
            "ok" => HealthStatus::Ok,
            "unknown" => HealthStatus::Unknown,
            other => HealthStatus::Status(other.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Ok => f.write_str("ok"),
            HealthStatus::Unknown => f.write_str("unknown"),
            HealthStatus::Status(status) => f.write_str(status),
        }
    }
}
