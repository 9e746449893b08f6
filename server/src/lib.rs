//! Docbridge Server Library
//!
//! This module exports the connector components for use in integration tests
//! and external tooling.

pub mod config;
pub mod documents;
pub mod driver;
pub mod protocol;
pub mod session;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use documents::{ConnectorAppState, DocumentFacade, connector_routes};
pub use driver::{DocumentStore, MemoryStore, TransactionHandle};
pub use protocol::{ConnectorConfig, ConnectorResponse};
pub use session::SessionManager;
