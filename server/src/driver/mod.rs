//! Document store driver seam
//!
//! This module provides:
//! - `DocumentStore` trait for abstracting backing stores
//! - `TransactionHandle` trait for open transactions
//! - `MemoryStore`, a bundled in-memory implementation

mod memory;
mod service;
mod types;

pub use memory::MemoryStore;
pub use service::{DocumentStore, TransactionHandle};
pub use types::{DeleteOutcome, StoreError, Target, UpdateOutcome};
