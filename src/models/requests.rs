//! Request options
//!
//! Per-call options forwarded to the node alongside a read.

use serde::{Deserialize, Serialize};

/// Options for block and transaction reads.
///
/// `max_supported_transaction_version` controls whether versioned
/// transactions are returned; `None` asks for legacy transactions only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_supported_transaction_version: Option<u8>,
}

impl BlockOptions {
    pub fn legacy_only() -> Self {
        Self {
            max_supported_transaction_version: None,
        }
    }
}

impl Default for BlockOptions {
    fn default() -> Self {
        Self {
            max_supported_transaction_version: Some(0),
        }
    }
}
