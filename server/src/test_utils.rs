//! Test utilities
//!
//! Mock driver implementations and fixtures shared by the unit tests. Only
//! compiled when running tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::driver::{
    DeleteOutcome, DocumentStore, StoreError, Target, TransactionHandle, UpdateOutcome,
};
use crate::protocol::ConnectorConfig;

/// Per-request config fixture with the serde defaults applied
pub fn test_config() -> ConnectorConfig {
    serde_json::from_value(json!({
        "connectionString": "mem://test",
        "databaseName": "app",
        "collectionName": "orders",
    }))
    .expect("valid test config")
}

/// Transaction handle that records commits, aborts, and drops
pub struct MockHandle {
    token: Uuid,
    commits: Arc<AtomicUsize>,
    aborts: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
    fail_commit: bool,
}

impl MockHandle {
    /// Standalone handle paired with its drop counter
    pub fn tracked() -> (Arc<dyn TransactionHandle>, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let handle = Arc::new(MockHandle {
            token: Uuid::new_v4(),
            commits: Arc::new(AtomicUsize::new(0)),
            aborts: Arc::new(AtomicUsize::new(0)),
            drops: Arc::clone(&drops),
            fail_commit: false,
        });
        (handle, drops)
    }
}

#[async_trait]
impl TransactionHandle for MockHandle {
    fn token(&self) -> Uuid {
        self.token
    }

    async fn commit(&self) -> Result<(), StoreError> {
        if self.fail_commit {
            return Err(StoreError::Transaction("simulated commit failure".into()));
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abort(&self) -> Result<(), StoreError> {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Document store whose only working operation is `begin_transaction`;
/// document operations report the store as unavailable. Used to test the
/// session lifecycle in isolation.
pub struct MockStore {
    pub begun: AtomicUsize,
    pub commits: Arc<AtomicUsize>,
    pub aborts: Arc<AtomicUsize>,
    pub handle_drops: Arc<AtomicUsize>,
    fail_commit: bool,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            begun: AtomicUsize::new(0),
            commits: Arc::new(AtomicUsize::new(0)),
            aborts: Arc::new(AtomicUsize::new(0)),
            handle_drops: Arc::new(AtomicUsize::new(0)),
            fail_commit: false,
        }
    }

    /// Store whose handles fail every commit
    pub fn failing_commit() -> Self {
        Self {
            fail_commit: true,
            ..Self::new()
        }
    }

    fn unavailable<T>(&self) -> Result<T, StoreError> {
        Err(StoreError::Unavailable("mock store".into()))
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn begin_transaction(
        &self,
        _config: &ConnectorConfig,
    ) -> Result<Arc<dyn TransactionHandle>, StoreError> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockHandle {
            token: Uuid::new_v4(),
            commits: Arc::clone(&self.commits),
            aborts: Arc::clone(&self.aborts),
            drops: Arc::clone(&self.handle_drops),
            fail_commit: self.fail_commit,
        }))
    }

    async fn insert_one(
        &self,
        _target: &Target,
        _document: Value,
        _txn: Option<&dyn TransactionHandle>,
    ) -> Result<String, StoreError> {
        self.unavailable()
    }

    async fn find(&self, _target: &Target, _filter: Value) -> Result<Vec<Value>, StoreError> {
        self.unavailable()
    }

    async fn find_page(
        &self,
        _target: &Target,
        _skip: usize,
        _limit: usize,
    ) -> Result<Vec<Value>, StoreError> {
        self.unavailable()
    }

    async fn find_by_id(&self, _target: &Target, _id: &str) -> Result<Value, StoreError> {
        self.unavailable()
    }

    async fn update_one(
        &self,
        _target: &Target,
        _filter: Value,
        _update: Value,
        _txn: Option<&dyn TransactionHandle>,
    ) -> Result<UpdateOutcome, StoreError> {
        self.unavailable()
    }

    async fn delete_one(
        &self,
        _target: &Target,
        _filter: Value,
        _txn: Option<&dyn TransactionHandle>,
    ) -> Result<DeleteOutcome, StoreError> {
        self.unavailable()
    }

    async fn count(&self, _target: &Target, _filter: Value) -> Result<u64, StoreError> {
        self.unavailable()
    }

    async fn aggregate(
        &self,
        _target: &Target,
        _pipeline: Vec<Value>,
        _txn: Option<&dyn TransactionHandle>,
    ) -> Result<Vec<Value>, StoreError> {
        self.unavailable()
    }

    async fn explain_aggregate(
        &self,
        _target: &Target,
        _pipeline: Vec<Value>,
        _verbose: bool,
    ) -> Result<Value, StoreError> {
        self.unavailable()
    }

    async fn collection_stats(&self, _target: &Target) -> Result<Value, StoreError> {
        self.unavailable()
    }

    async fn list_indexes(&self, _target: &Target) -> Result<Vec<Value>, StoreError> {
        self.unavailable()
    }
}
