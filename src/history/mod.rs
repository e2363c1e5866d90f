//! Undo log for file mutations.
//!
//! This module provides:
//! - `entry`: Rename records and batch grouping over the log
//! - `store`: Persistence backends for the log (JSON file, in-memory)
//! - `undo`: Reversal of the most recent batch with per-record conflicts

mod entry;
mod store;
mod undo;

pub use entry::*;
pub use store::*;
pub use undo::*;
