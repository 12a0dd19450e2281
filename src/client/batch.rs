//! Windowed block batches.

use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::debug;

use crate::client::ResilientClient;
use crate::error::{ClientError, Result};
use crate::models::{Block, BlockOptions};

/// Widest slot range a single `get_blocks` call may request.
pub const MAX_BATCH: u64 = 500;

// == Block Range ==
/// An inclusive, non-empty slot range no wider than `MAX_BATCH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    from_slot: u64,
    to_slot: u64,
}

impl BlockRange {
    /// Validates `from_slot..=to_slot`.
    ///
    /// # Errors
    /// - `InvalidRange` if `to_slot < from_slot`
    /// - `RangeTooLarge` if the range spans more than `MAX_BATCH` slots
    pub fn new(from_slot: u64, to_slot: u64) -> Result<Self> {
        if to_slot < from_slot {
            return Err(ClientError::InvalidRange { from_slot, to_slot });
        }

        let requested = (to_slot - from_slot).saturating_add(1);
        if requested > MAX_BATCH {
            return Err(ClientError::RangeTooLarge {
                requested,
                max: MAX_BATCH,
            });
        }

        Ok(Self { from_slot, to_slot })
    }

    pub fn from_slot(&self) -> u64 {
        self.from_slot
    }

    pub fn to_slot(&self) -> u64 {
        self.to_slot
    }

    /// Number of slots in the range (always at least one).
    pub fn slot_count(&self) -> u64 {
        self.to_slot - self.from_slot + 1
    }

    pub fn slots(&self) -> RangeInclusive<u64> {
        self.from_slot..=self.to_slot
    }
}

impl ResilientClient {
    /// Blocks for every slot in `from_slot..=to_slot`, in slot order.
    ///
    /// The range is validated before any request is made. Slots are then
    /// fetched one at a time through `get_block`, so each one is cached and
    /// retried on its own; a slot without a block yields `None` at its
    /// position instead of failing the batch.
    pub async fn get_blocks(
        &self,
        from_slot: u64,
        to_slot: u64,
        options: BlockOptions,
    ) -> Result<Vec<Option<Arc<Block>>>> {
        let range = BlockRange::new(from_slot, to_slot)?;
        debug!(from_slot, to_slot, "Fetching block range");

        let mut blocks = Vec::with_capacity(range.slot_count() as usize);
        for slot in range.slots() {
            blocks.push(self.get_block(slot, options).await?);
        }
        Ok(blocks)
    }
}
