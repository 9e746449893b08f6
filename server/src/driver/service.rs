//! DocumentStore and TransactionHandle trait definitions

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::protocol::ConnectorConfig;

use super::types::{DeleteOutcome, StoreError, Target, UpdateOutcome};

/// An open transaction against the backing store.
///
/// The session registry holds the only long-lived reference; dropping the
/// last clone releases whatever the driver staged for this transaction, so a
/// handle is never left dangling and never released twice.
#[async_trait]
pub trait TransactionHandle: Send + Sync {
    /// Store-side identifier tying buffered writes to this transaction
    fn token(&self) -> Uuid;

    /// Make all writes performed under this handle durable
    async fn commit(&self) -> Result<(), StoreError>;

    /// Discard all writes performed under this handle
    async fn abort(&self) -> Result<(), StoreError>;
}

/// Trait for document stores (bundled in-memory store or a real driver)
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a new transaction
    async fn begin_transaction(
        &self,
        config: &ConnectorConfig,
    ) -> Result<Arc<dyn TransactionHandle>, StoreError>;

    /// Insert a document, returning its id
    async fn insert_one(
        &self,
        target: &Target,
        document: Value,
        txn: Option<&dyn TransactionHandle>,
    ) -> Result<String, StoreError>;

    /// Fetch all documents matching a filter (empty filter matches everything)
    async fn find(&self, target: &Target, filter: Value) -> Result<Vec<Value>, StoreError>;

    /// Fetch a page of documents in insertion order
    async fn find_page(
        &self,
        target: &Target,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Value>, StoreError>;

    /// Fetch a single document by its id
    async fn find_by_id(&self, target: &Target, id: &str) -> Result<Value, StoreError>;

    /// Update the first document matching the filter
    async fn update_one(
        &self,
        target: &Target,
        filter: Value,
        update: Value,
        txn: Option<&dyn TransactionHandle>,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Delete the first document matching the filter
    async fn delete_one(
        &self,
        target: &Target,
        filter: Value,
        txn: Option<&dyn TransactionHandle>,
    ) -> Result<DeleteOutcome, StoreError>;

    /// Count documents matching a filter
    async fn count(&self, target: &Target, filter: Value) -> Result<u64, StoreError>;

    /// Check whether any document matches a filter
    async fn exists(&self, target: &Target, filter: Value) -> Result<bool, StoreError> {
        Ok(self.count(target, filter).await? > 0)
    }

    /// Run an aggregation pipeline
    async fn aggregate(
        &self,
        target: &Target,
        pipeline: Vec<Value>,
        txn: Option<&dyn TransactionHandle>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Explain an aggregation pipeline without materializing its results
    async fn explain_aggregate(
        &self,
        target: &Target,
        pipeline: Vec<Value>,
        verbose: bool,
    ) -> Result<Value, StoreError>;

    /// Collection statistics (`collStats`-shaped document)
    async fn collection_stats(&self, target: &Target) -> Result<Value, StoreError>;

    /// List indexes defined on the collection
    async fn list_indexes(&self, target: &Target) -> Result<Vec<Value>, StoreError>;
}
