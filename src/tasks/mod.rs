//! Background Tasks Module
//!
//! # Tasks
//! - TTL Cleanup: purges expired read results at the configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
