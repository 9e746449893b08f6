//! In-memory document store
//!
//! Backs the connector in tests and single-process deployments. Implements an
//! explicit subset of the document-store semantics: top-level equality
//! filters, `$set`/`$unset` updates, and `$match`/`$skip`/`$limit`/`$count`
//! pipeline stages. Writes performed under a transaction are buffered against
//! the handle's token and only published on commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::ConnectorConfig;

use super::service::{DocumentStore, TransactionHandle};
use super::types::{DeleteOutcome, StoreError, Target, UpdateOutcome};

/// A write buffered under an open transaction
#[derive(Debug, Clone)]
enum StagedWrite {
    Insert {
        target: Target,
        document: Value,
    },
    Update {
        target: Target,
        filter: Value,
        update: Value,
    },
    Delete {
        target: Target,
        filter: Value,
    },
}

struct StoreInner {
    collections: RwLock<HashMap<Target, Vec<Value>>>,
    staged: DashMap<Uuid, Vec<StagedWrite>>,
}

/// In-memory `DocumentStore` implementation
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                collections: RwLock::new(HashMap::new()),
                staged: DashMap::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Transaction handle for the in-memory store.
///
/// Staged writes live in the store's `staged` map keyed by `token`; the
/// `Drop` impl clears the entry, so an abandoned handle cannot leak its
/// buffer once the registry drops it.
struct MemoryTransactionHandle {
    token: Uuid,
    inner: Arc<StoreInner>,
}

#[async_trait]
impl TransactionHandle for MemoryTransactionHandle {
    fn token(&self) -> Uuid {
        self.token
    }

    async fn commit(&self) -> Result<(), StoreError> {
        let writes = self
            .inner
            .staged
            .remove(&self.token)
            .map(|(_, writes)| writes)
            .ok_or_else(|| StoreError::Transaction("transaction already finalized".into()))?;

        // All staged writes are published under a single write lock
        let mut collections = self.inner.collections.write().await;
        for write in writes {
            match write {
                StagedWrite::Insert { target, document } => {
                    collections.entry(target).or_default().push(document);
                }
                StagedWrite::Update {
                    target,
                    filter,
                    update,
                } => {
                    if let Some(docs) = collections.get_mut(&target)
                        && let Some(doc) = docs.iter_mut().find(|d| matches_filter(d, &filter))
                    {
                        apply_update(doc, &update)?;
                    }
                }
                StagedWrite::Delete { target, filter } => {
                    if let Some(docs) = collections.get_mut(&target)
                        && let Some(pos) = docs.iter().position(|d| matches_filter(d, &filter))
                    {
                        docs.remove(pos);
                    }
                }
            }
        }
        debug!("Committed in-memory transaction {}", self.token);
        Ok(())
    }

    async fn abort(&self) -> Result<(), StoreError> {
        self.inner
            .staged
            .remove(&self.token)
            .ok_or_else(|| StoreError::Transaction("transaction already finalized".into()))?;
        debug!("Aborted in-memory transaction {}", self.token);
        Ok(())
    }
}

impl Drop for MemoryTransactionHandle {
    fn drop(&mut self) {
        self.inner.staged.remove(&self.token);
    }
}

impl MemoryStore {
    /// Buffer a write under the given transaction token.
    fn stage(&self, token: Uuid, write: StagedWrite) -> Result<(), StoreError> {
        let mut entry = self
            .inner
            .staged
            .get_mut(&token)
            .ok_or_else(|| StoreError::Transaction(format!("unknown transaction {token}")))?;
        entry.push(write);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn begin_transaction(
        &self,
        _config: &ConnectorConfig,
    ) -> Result<Arc<dyn TransactionHandle>, StoreError> {
        let token = Uuid::new_v4();
        self.inner.staged.insert(token, Vec::new());
        debug!("Started in-memory transaction {}", token);
        Ok(Arc::new(MemoryTransactionHandle {
            token,
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn insert_one(
        &self,
        target: &Target,
        mut document: Value,
        txn: Option<&dyn TransactionHandle>,
    ) -> Result<String, StoreError> {
        let obj = document
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidDocument("document must be a JSON object".into()))?;
        let id = match obj.get("_id") {
            Some(existing) => id_string(existing),
            None => {
                let id = Uuid::new_v4().to_string();
                obj.insert("_id".into(), Value::String(id.clone()));
                id
            }
        };

        match txn {
            Some(handle) => self.stage(
                handle.token(),
                StagedWrite::Insert {
                    target: target.clone(),
                    document,
                },
            )?,
            None => {
                let mut collections = self.inner.collections.write().await;
                collections.entry(target.clone()).or_default().push(document);
            }
        }
        Ok(id)
    }

    async fn find(&self, target: &Target, filter: Value) -> Result<Vec<Value>, StoreError> {
        require_filter_object(&filter)?;
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(target)
            .map(|docs| {
                docs.iter()
                    .filter(|d| matches_filter(d, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_page(
        &self,
        target: &Target,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(target)
            .map(|docs| docs.iter().skip(skip).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_by_id(&self, target: &Target, id: &str) -> Result<Value, StoreError> {
        let collections = self.inner.collections.read().await;
        collections
            .get(target)
            .and_then(|docs| {
                docs.iter()
                    .find(|d| d.get("_id").is_some_and(|v| id_string(v) == id))
            })
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_one(
        &self,
        target: &Target,
        filter: Value,
        update: Value,
        txn: Option<&dyn TransactionHandle>,
    ) -> Result<UpdateOutcome, StoreError> {
        require_filter_object(&filter)?;
        validate_update(&update)?;

        match txn {
            Some(handle) => {
                // Outcome is evaluated against committed state; the write
                // itself is only published on commit.
                let outcome = {
                    let collections = self.inner.collections.read().await;
                    match collections
                        .get(target)
                        .and_then(|docs| docs.iter().find(|d| matches_filter(d, &filter)))
                    {
                        Some(doc) => {
                            let mut preview = doc.clone();
                            let modified = apply_update(&mut preview, &update)?;
                            UpdateOutcome {
                                matched: 1,
                                modified: modified as u64,
                            }
                        }
                        None => UpdateOutcome::default(),
                    }
                };
                self.stage(
                    handle.token(),
                    StagedWrite::Update {
                        target: target.clone(),
                        filter,
                        update,
                    },
                )?;
                Ok(outcome)
            }
            None => {
                let mut collections = self.inner.collections.write().await;
                match collections
                    .get_mut(target)
                    .and_then(|docs| docs.iter_mut().find(|d| matches_filter(d, &filter)))
                {
                    Some(doc) => {
                        let modified = apply_update(doc, &update)?;
                        Ok(UpdateOutcome {
                            matched: 1,
                            modified: modified as u64,
                        })
                    }
                    None => Ok(UpdateOutcome::default()),
                }
            }
        }
    }

    async fn delete_one(
        &self,
        target: &Target,
        filter: Value,
        txn: Option<&dyn TransactionHandle>,
    ) -> Result<DeleteOutcome, StoreError> {
        require_filter_object(&filter)?;

        match txn {
            Some(handle) => {
                let deleted = {
                    let collections = self.inner.collections.read().await;
                    collections
                        .get(target)
                        .is_some_and(|docs| docs.iter().any(|d| matches_filter(d, &filter)))
                };
                self.stage(
                    handle.token(),
                    StagedWrite::Delete {
                        target: target.clone(),
                        filter,
                    },
                )?;
                Ok(DeleteOutcome {
                    deleted: deleted as u64,
                })
            }
            None => {
                let mut collections = self.inner.collections.write().await;
                let deleted = match collections.get_mut(target) {
                    Some(docs) => match docs.iter().position(|d| matches_filter(d, &filter)) {
                        Some(pos) => {
                            docs.remove(pos);
                            1
                        }
                        None => 0,
                    },
                    None => 0,
                };
                Ok(DeleteOutcome { deleted })
            }
        }
    }

    async fn count(&self, target: &Target, filter: Value) -> Result<u64, StoreError> {
        require_filter_object(&filter)?;
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(target)
            .map(|docs| docs.iter().filter(|d| matches_filter(d, &filter)).count() as u64)
            .unwrap_or(0))
    }

    async fn aggregate(
        &self,
        target: &Target,
        pipeline: Vec<Value>,
        _txn: Option<&dyn TransactionHandle>,
    ) -> Result<Vec<Value>, StoreError> {
        let docs = {
            let collections = self.inner.collections.read().await;
            collections.get(target).cloned().unwrap_or_default()
        };
        run_pipeline(docs, &pipeline)
    }

    async fn explain_aggregate(
        &self,
        target: &Target,
        pipeline: Vec<Value>,
        verbose: bool,
    ) -> Result<Value, StoreError> {
        let stages = pipeline
            .iter()
            .map(stage_name)
            .collect::<Result<Vec<_>, _>>()?;

        let mut explain = json!({
            "explainVersion": "1",
            "queryPlanner": {
                "namespace": target.namespace(),
                "stages": stages,
            },
        });

        if verbose {
            let docs = {
                let collections = self.inner.collections.read().await;
                collections.get(target).cloned().unwrap_or_default()
            };
            let results = run_pipeline(docs, &pipeline)?;
            explain["executionStats"] = json!({
                "executionSuccess": true,
                "nReturned": results.len(),
            });
        }

        Ok(explain)
    }

    async fn collection_stats(&self, target: &Target) -> Result<Value, StoreError> {
        let collections = self.inner.collections.read().await;
        let docs = collections.get(target);
        let count = docs.map(|d| d.len()).unwrap_or(0);
        let size: usize = docs
            .map(|d| d.iter().map(|doc| doc.to_string().len()).sum())
            .unwrap_or(0);
        let avg = if count > 0 { size / count } else { 0 };

        Ok(json!({
            "ns": target.namespace(),
            "count": count,
            "size": size,
            "avgObjSize": avg,
            "capped": false,
        }))
    }

    async fn list_indexes(&self, target: &Target) -> Result<Vec<Value>, StoreError> {
        // The in-memory store only maintains the implicit _id index
        let _ = target;
        Ok(vec![json!({
            "v": 2,
            "key": { "_id": 1 },
            "name": "_id_",
        })])
    }
}

/// Render a document id as a plain string
fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn require_filter_object(filter: &Value) -> Result<(), StoreError> {
    if filter.is_object() {
        Ok(())
    } else {
        Err(StoreError::UnsupportedFilter(
            "filter must be a JSON object".into(),
        ))
    }
}

/// Top-level equality match: every filter field must be present in the
/// document with an equal value. An empty filter matches everything.
fn matches_filter(doc: &Value, filter: &Value) -> bool {
    match filter.as_object() {
        Some(fields) => fields.iter().all(|(k, v)| doc.get(k) == Some(v)),
        None => false,
    }
}

fn validate_update(update: &Value) -> Result<(), StoreError> {
    let obj = update
        .as_object()
        .ok_or_else(|| StoreError::UnsupportedUpdate("update must be a JSON object".into()))?;
    if obj.is_empty() {
        return Err(StoreError::UnsupportedUpdate("empty update".into()));
    }
    for op in obj.keys() {
        if op != "$set" && op != "$unset" {
            return Err(StoreError::UnsupportedUpdate(op.clone()));
        }
    }
    Ok(())
}

/// Apply a validated `$set`/`$unset` update. Returns whether the document
/// changed.
fn apply_update(doc: &mut Value, update: &Value) -> Result<bool, StoreError> {
    let Some(target) = doc.as_object_mut() else {
        return Ok(false);
    };
    let mut changed = false;

    if let Some(set) = update.get("$set").and_then(Value::as_object) {
        for (k, v) in set {
            if target.get(k) != Some(v) {
                target.insert(k.clone(), v.clone());
                changed = true;
            }
        }
    }
    if let Some(unset) = update.get("$unset").and_then(Value::as_object) {
        for k in unset.keys() {
            if target.remove(k).is_some() {
                changed = true;
            }
        }
    }
    Ok(changed)
}

fn stage_name(stage: &Value) -> Result<String, StoreError> {
    let obj = stage
        .as_object()
        .filter(|o| o.len() == 1)
        .ok_or_else(|| {
            StoreError::UnsupportedStage("each stage must be a single-key object".into())
        })?;
    let name = obj.keys().next().expect("checked non-empty").clone();
    match name.as_str() {
        "$match" | "$skip" | "$limit" | "$count" => Ok(name),
        other => Err(StoreError::UnsupportedStage(other.to_string())),
    }
}

fn run_pipeline(mut docs: Vec<Value>, pipeline: &[Value]) -> Result<Vec<Value>, StoreError> {
    for stage in pipeline {
        let name = stage_name(stage)?;
        let arg = &stage[name.as_str()];
        match name.as_str() {
            "$match" => {
                require_filter_object(arg)?;
                docs.retain(|d| matches_filter(d, arg));
            }
            "$skip" => {
                let n = arg.as_u64().ok_or_else(|| {
                    StoreError::UnsupportedStage("$skip requires a non-negative integer".into())
                })? as usize;
                docs = docs.into_iter().skip(n).collect();
            }
            "$limit" => {
                let n = arg.as_u64().ok_or_else(|| {
                    StoreError::UnsupportedStage("$limit requires a non-negative integer".into())
                })? as usize;
                docs.truncate(n);
            }
            "$count" => {
                let field = arg.as_str().ok_or_else(|| {
                    StoreError::UnsupportedStage("$count requires a field name".into())
                })?;
                docs = vec![json!({ field: docs.len() })];
            }
            _ => unreachable!("stage_name validated the stage"),
        }
    }
    Ok(docs)
}
