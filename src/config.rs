//! Configuration Module
//!
//! Handles loading and managing client configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::error::{ClientError, Result};
use crate::models::Commitment;
use crate::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};

/// Endpoint used when `RPC_URL` is not set
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Client configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC HTTP endpoint
    pub rpc_url: String,
    /// Pubsub endpoint; derived from `rpc_url` when unset
    pub ws_url: Option<String>,
    /// Commitment for reads and log subscriptions
    pub commitment: Commitment,
    /// Lifetime of cached read results
    pub cache_ttl: Duration,
    /// Maximum number of cached read results
    pub cache_capacity: usize,
    /// Attempts per read before the failure is surfaced
    pub retry_attempts: u32,
    /// Backoff unit; attempt `i` waits `retry_base_delay * i`
    pub retry_base_delay: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Interval of the background purge of expired cache entries
    pub cleanup_interval: Duration,
}

impl Config {
    /// Creates a configuration for `rpc_url` with every other value defaulted.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ws_url: None,
            commitment: Commitment::Confirmed,
            cache_ttl: Duration::from_secs(30),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            retry_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: DEFAULT_BASE_DELAY,
            request_timeout: Duration::from_secs(30),
            cleanup_interval: Duration::from_secs(60),
        }
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `RPC_URL` - JSON-RPC endpoint (default: mainnet-beta)
    /// - `RPC_WS_URL` - Pubsub endpoint (default: derived from `RPC_URL`)
    /// - `RPC_COMMITMENT` - processed / confirmed / finalized (default: confirmed)
    /// - `CACHE_TTL_MS` - Cache TTL in milliseconds (default: 30000)
    /// - `RETRY_ATTEMPTS` - Attempts per read (default: 4)
    /// - `RETRY_BASE_DELAY_MS` - Backoff unit in milliseconds (default: 200)
    /// - `REQUEST_TIMEOUT_MS` - HTTP timeout in milliseconds (default: 30000)
    /// - `CLEANUP_INTERVAL_SECS` - Expired-entry purge interval (default: 60)
    ///
    /// Unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::new(env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()));

        Self {
            ws_url: env::var("RPC_WS_URL").ok(),
            commitment: parse_var("RPC_COMMITMENT").unwrap_or(defaults.commitment),
            cache_ttl: parse_var("CACHE_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.cache_ttl),
            retry_attempts: parse_var("RETRY_ATTEMPTS").unwrap_or(defaults.retry_attempts),
            retry_base_delay: parse_var("RETRY_BASE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            request_timeout: parse_var("REQUEST_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            cleanup_interval: parse_var("CLEANUP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            ..defaults
        }
    }

    /// Rejects values the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.trim().is_empty() {
            return Err(ClientError::InvalidConfig("rpc_url is required".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(ClientError::InvalidConfig(
                "cache_capacity must be greater than 0".to_string(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(ClientError::InvalidConfig(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Pubsub endpoint: `ws_url` if set, else `rpc_url` with its scheme
    /// switched to `ws`/`wss`.
    pub fn websocket_url(&self) -> String {
        if let Some(ws_url) = &self.ws_url {
            return ws_url.clone();
        }
        if let Some(rest) = self.rpc_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.rpc_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.rpc_url.clone()
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
