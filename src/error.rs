//! Error types for the RPC client
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::transport::SubscriptionId;

// == Transport Error Enum ==
/// A failure raised by the underlying RPC service or the path to it.
///
/// Every variant is treated as transient by the retry executor; once the
/// attempt budget is spent the last one reaches the caller untouched.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Request could not be sent or the server answered with an HTTP error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response body did not have the expected shape
    #[error("Malformed RPC response: {0}")]
    Decode(String),

    /// Pubsub socket failure
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Unsubscribe for an id that is not registered
    #[error("Unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),

    /// The transport does not implement this capability
    #[error("{0} is not supported by this transport")]
    Unsupported(&'static str),

    /// Any other failure reported by a transport implementation
    #[error("Transport failure: {0}")]
    Other(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

// == Client Error Enum ==
/// Errors surfaced by the client's public operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The transport kept failing until the retry budget ran out
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Batch range with its end before its start
    #[error("Invalid range: to_slot ({to_slot}) must be >= from_slot ({from_slot})")]
    InvalidRange { from_slot: u64, to_slot: u64 },

    /// Batch range wider than the per-call window
    #[error("Range too large: {requested} slots requested, max {max} per call")]
    RangeTooLarge { requested: u64, max: u64 },

    /// Configuration rejected before the client was built
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the client.
pub type Result<T> = std::result::Result<T, ClientError>;
