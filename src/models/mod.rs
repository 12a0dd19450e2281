//! Data models for the RPC client
//!
//! Request options, typed read results and subscription events.

pub mod commitment;
pub mod logs;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use commitment::Commitment;
pub use logs::LogNotification;
pub use requests::BlockOptions;
pub use responses::{
    lamports_to_sol, AccountInfo, Block, HealthStatus, TransactionDetails, LAMPORTS_PER_SOL,
};
