//! Driver-facing types and error definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::ConnectorConfig;

/// Errors that can occur when talking to the backing document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Unsupported update operator: {0}")]
    UnsupportedUpdate(String),

    #[error("Unsupported pipeline stage: {0}")]
    UnsupportedStage(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Database/collection pair an operation runs against
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub database: String,
    pub collection: String,
}

impl Target {
    /// Namespace string in `database.collection` form
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

impl From<&ConnectorConfig> for Target {
    fn from(config: &ConnectorConfig) -> Self {
        Self {
            database: config.database_name.clone(),
            collection: config.collection_name.clone(),
        }
    }
}

/// Result of an update operation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// Result of a delete operation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub deleted: u64,
}
