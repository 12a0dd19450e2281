//! Log notifications
//!
//! Events pushed by the node for a `logsSubscribe` subscription.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One transaction's logs, delivered for a subscribed topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogNotification {
    /// Slot the transaction was processed in
    pub slot: u64,
    pub signature: String,
    /// Transaction error, `None` when it succeeded
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl LogNotification {
    pub fn succeeded(&self) -> bool {
        self.err.is_none()
    }
}
