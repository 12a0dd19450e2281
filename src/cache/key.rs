//! Cache Key Module
//!
//! Deterministic keys of the form `operation:argument`.

use std::fmt;

// == Cache Key ==
/// Identity of a cached read: the operation name joined to a stable encoding
/// of its arguments.
///
/// Identical logical requests always build identical keys. Options that do
/// not appear in the argument encoding (such as `BlockOptions`) do not
/// distinguish entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(operation: &str, argument: impl fmt::Display) -> Self {
        Self(format!("{operation}:{argument}"))
    }

    pub fn account_info(address: &str) -> Self {
        Self::new("accountInfo", address)
    }

    pub fn balance(address: &str) -> Self {
        Self::new("balance", address)
    }

    pub fn block(slot: u64) -> Self {
        Self::new("block", slot)
    }

    /// The health probe takes no arguments, so it lives under one versioned key.
    pub fn health() -> Self {
        Self::new("health", "v1")
    }

    pub fn transaction(signature: &str) -> Self {
        Self::new("tx", signature)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
