//! Transactional operation facade
//!
//! Entry points for the connector's document operations. Each call decides
//! between auto-commit and transactional mode from the config policy and the
//! presence of a caller-supplied session id, then wraps every outcome —
//! including driver failures and malformed payloads — into a uniform
//! `ConnectorResponse`. Nothing here panics for an expected condition.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use crate::driver::{DocumentStore, Target, TransactionHandle};
use crate::protocol::{ConnectorConfig, ConnectorResponse};
use crate::session::{SessionError, SessionId, SessionManager};

/// Facade over the document store and the session registry
pub struct DocumentFacade {
    store: Arc<dyn DocumentStore>,
    sessions: Arc<SessionManager>,
}

impl DocumentFacade {
    pub fn new(store: Arc<dyn DocumentStore>, sessions: Arc<SessionManager>) -> Self {
        Self { store, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Resolve the transaction binding for a mutating operation.
    ///
    /// `None` means auto-commit: the config allows it and the caller supplied
    /// no session id. Anything else resumes or creates a session.
    async fn bind_session(
        &self,
        config: &ConnectorConfig,
        requested: Option<&str>,
    ) -> Result<Option<(Arc<dyn TransactionHandle>, SessionId)>, SessionError> {
        let requested = requested.filter(|id| !id.is_empty());
        if config.auto_commit_transactions && requested.is_none() {
            return Ok(None);
        }
        self.sessions
            .resolve_or_create(
                self.store.as_ref(),
                config,
                requested,
                config.transaction_default_timeout_secs,
            )
            .await
            .map(Some)
    }

    pub async fn create_document(
        &self,
        config: &ConnectorConfig,
        document: &str,
        session_id: Option<&str>,
    ) -> ConnectorResponse {
        let document = match parse_document(document) {
            Ok(doc) => doc,
            Err(e) => return ConnectorResponse::failure(format!("Create failed: {e}")),
        };
        let target = Target::from(config);

        match self.bind_session(config, session_id).await {
            Err(e) => ConnectorResponse::failure(format!("Create failed: {e}")),
            Ok(None) => match self.store.insert_one(&target, document, None).await {
                Ok(_) => ConnectorResponse::ok("Document created successfully"),
                Err(e) => ConnectorResponse::failure(format!("Create failed: {e}")),
            },
            Ok(Some((handle, sid))) => {
                let response = match self
                    .store
                    .insert_one(&target, document, Some(handle.as_ref()))
                    .await
                {
                    Ok(_) => ConnectorResponse::ok("Document created successfully"),
                    Err(e) => ConnectorResponse::failure(format!("Create failed: {e}")),
                };
                // The session stays pending either way; the caller decides
                // whether to commit or abort after a failed step.
                response.with_session(sid)
            }
        }
    }

    pub async fn update_document(
        &self,
        config: &ConnectorConfig,
        filter: &str,
        update: &str,
        session_id: Option<&str>,
    ) -> ConnectorResponse {
        let filter = match parse_filter(filter) {
            Ok(f) => f,
            Err(e) => return ConnectorResponse::failure(format!("Update failed: {e}")),
        };
        let update = match parse_object(update, "update") {
            Ok(u) => u,
            Err(e) => return ConnectorResponse::failure(format!("Update failed: {e}")),
        };
        let target = Target::from(config);

        match self.bind_session(config, session_id).await {
            Err(e) => ConnectorResponse::failure(format!("Update failed: {e}")),
            Ok(None) => match self.store.update_one(&target, filter, update, None).await {
                Ok(outcome) => {
                    ConnectorResponse::ok(format!("Modified {} documents", outcome.modified))
                }
                Err(e) => ConnectorResponse::failure(format!("Update failed: {e}")),
            },
            Ok(Some((handle, sid))) => {
                let response = match self
                    .store
                    .update_one(&target, filter, update, Some(handle.as_ref()))
                    .await
                {
                    Ok(outcome) => {
                        ConnectorResponse::ok(format!("Modified {} documents", outcome.modified))
                    }
                    Err(e) => ConnectorResponse::failure(format!("Update failed: {e}")),
                };
                response.with_session(sid)
            }
        }
    }

    pub async fn delete_document(
        &self,
        config: &ConnectorConfig,
        filter: &str,
        session_id: Option<&str>,
    ) -> ConnectorResponse {
        let filter = match parse_filter(filter) {
            Ok(f) => f,
            Err(e) => return ConnectorResponse::failure(format!("Delete failed: {e}")),
        };
        let target = Target::from(config);

        match self.bind_session(config, session_id).await {
            Err(e) => ConnectorResponse::failure(format!("Delete failed: {e}")),
            Ok(None) => match self.store.delete_one(&target, filter, None).await {
                Ok(outcome) => {
                    ConnectorResponse::ok(format!("Deleted {} documents", outcome.deleted))
                }
                Err(e) => ConnectorResponse::failure(format!("Delete failed: {e}")),
            },
            Ok(Some((handle, sid))) => {
                let response = match self
                    .store
                    .delete_one(&target, filter, Some(handle.as_ref()))
                    .await
                {
                    Ok(outcome) => {
                        ConnectorResponse::ok(format!("Deleted {} documents", outcome.deleted))
                    }
                    Err(e) => ConnectorResponse::failure(format!("Delete failed: {e}")),
                };
                response.with_session(sid)
            }
        }
    }

    pub async fn aggregate_collection(
        &self,
        config: &ConnectorConfig,
        pipeline: &str,
        session_id: Option<&str>,
    ) -> ConnectorResponse {
        let pipeline = match parse_pipeline(pipeline) {
            Ok(p) => p,
            Err(e) => return ConnectorResponse::failure(format!("Aggregation failed: {e}")),
        };
        let target = Target::from(config);

        match self.bind_session(config, session_id).await {
            Err(e) => ConnectorResponse::failure(format!("Aggregation failed: {e}")),
            Ok(None) => match self.store.aggregate(&target, pipeline, None).await {
                Ok(results) => results_response(&results),
                Err(e) => ConnectorResponse::failure(format!("Aggregation failed: {e}")),
            },
            Ok(Some((handle, sid))) => {
                let response = match self
                    .store
                    .aggregate(&target, pipeline, Some(handle.as_ref()))
                    .await
                {
                    Ok(results) => results_response(&results),
                    Err(e) => ConnectorResponse::failure(format!("Aggregation failed: {e}")),
                };
                response.with_session(sid)
            }
        }
    }

    pub async fn get_documents(&self, config: &ConnectorConfig, filter: &str) -> ConnectorResponse {
        let filter = match parse_filter(filter) {
            Ok(f) => f,
            Err(e) => return ConnectorResponse::failure(format!("Query failed: {e}")),
        };
        match self.store.find(&Target::from(config), filter).await {
            Ok(docs) => results_response(&docs),
            Err(e) => ConnectorResponse::failure(format!("Query failed: {e}")),
        }
    }

    pub async fn get_paged_documents(
        &self,
        config: &ConnectorConfig,
        skip: usize,
        limit: usize,
    ) -> ConnectorResponse {
        match self
            .store
            .find_page(&Target::from(config), skip, limit)
            .await
        {
            Ok(docs) => results_response(&docs),
            Err(e) => ConnectorResponse::failure(format!("getPagedDocuments failed: {e}")),
        }
    }

    pub async fn get_document_by_id(
        &self,
        config: &ConnectorConfig,
        document_id: &str,
    ) -> ConnectorResponse {
        match self.store.find_by_id(&Target::from(config), document_id).await {
            Ok(doc) => ConnectorResponse::ok_with_data("Document found", doc.to_string()),
            Err(e) => ConnectorResponse::failure(format!("GetDocumentById failed: {e}")),
        }
    }

    pub async fn count_documents(
        &self,
        config: &ConnectorConfig,
        filter: &str,
    ) -> ConnectorResponse {
        let filter = match parse_filter(filter) {
            Ok(f) => f,
            Err(e) => return ConnectorResponse::failure(format!("Count failed: {e}")),
        };
        match self.store.count(&Target::from(config), filter).await {
            Ok(count) => ConnectorResponse::ok_with_data(
                format!("Counted {count} documents"),
                json!({ "count": count }).to_string(),
            ),
            Err(e) => ConnectorResponse::failure(format!("Count failed: {e}")),
        }
    }

    pub async fn document_exists(
        &self,
        config: &ConnectorConfig,
        filter: &str,
    ) -> ConnectorResponse {
        let filter = match parse_filter(filter) {
            Ok(f) => f,
            Err(e) => return ConnectorResponse::failure(format!("Exists check failed: {e}")),
        };
        match self.store.exists(&Target::from(config), filter).await {
            Ok(exists) => ConnectorResponse::ok_with_data(
                if exists {
                    "Document exists"
                } else {
                    "No matching document"
                },
                json!({ "exists": exists }).to_string(),
            ),
            Err(e) => ConnectorResponse::failure(format!("Exists check failed: {e}")),
        }
    }

    pub async fn aggregate_explain(
        &self,
        config: &ConnectorConfig,
        pipeline: &str,
        verbose: bool,
    ) -> ConnectorResponse {
        let pipeline = match parse_pipeline(pipeline) {
            Ok(p) => p,
            Err(e) => return ConnectorResponse::failure(format!("Aggregate explain failed: {e}")),
        };
        match self
            .store
            .explain_aggregate(&Target::from(config), pipeline, verbose)
            .await
        {
            Ok(plan) => ConnectorResponse::ok_with_data("Explain succeeded", plan.to_string()),
            Err(e) => ConnectorResponse::failure(format!("Aggregate explain failed: {e}")),
        }
    }

    pub async fn get_collection_stats(&self, config: &ConnectorConfig) -> ConnectorResponse {
        match self.store.collection_stats(&Target::from(config)).await {
            Ok(stats) => ConnectorResponse::ok_with_data("Stats retrieved", stats.to_string()),
            Err(e) => ConnectorResponse::failure(format!("GetCollectionStats failed: {e}")),
        }
    }

    pub async fn get_index_info(&self, config: &ConnectorConfig) -> ConnectorResponse {
        match self.store.list_indexes(&Target::from(config)).await {
            Ok(indexes) => match serde_json::to_string(&indexes) {
                Ok(data) => ConnectorResponse::ok_with_data("Indexes retrieved", data),
                Err(e) => ConnectorResponse::failure(format!("GetIndexInfo failed: {e}")),
            },
            Err(e) => ConnectorResponse::failure(format!("GetIndexInfo failed: {e}")),
        }
    }

    pub async fn commit_transaction(&self, session_id: &str) -> ConnectorResponse {
        debug!("Commit requested for session {}", session_id);
        match self.sessions.commit(session_id).await {
            Ok(message) => ConnectorResponse::ok(message),
            Err(e) => ConnectorResponse::failure(e.to_string()),
        }
    }

    pub async fn abort_transaction(&self, session_id: &str) -> ConnectorResponse {
        debug!("Abort requested for session {}", session_id);
        match self.sessions.abort(session_id).await {
            Ok(message) => ConnectorResponse::ok(message),
            Err(e) => ConnectorResponse::failure(e.to_string()),
        }
    }
}

fn results_response(docs: &[Value]) -> ConnectorResponse {
    match serde_json::to_string(docs) {
        Ok(data) => ConnectorResponse::ok_with_data(format!("Found {} documents", docs.len()), data),
        Err(e) => ConnectorResponse::failure(format!("Query failed: {e}")),
    }
}

fn parse_object(json: &str, what: &str) -> Result<Value, String> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| format!("invalid {what} JSON: {e}"))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(format!("invalid {what} JSON: expected an object"))
    }
}

fn parse_document(json: &str) -> Result<Value, String> {
    parse_object(json, "document")
}

/// An empty filter string matches everything (original connector behavior).
fn parse_filter(json: &str) -> Result<Value, String> {
    if json.trim().is_empty() {
        return Ok(json!({}));
    }
    parse_object(json, "filter")
}

fn parse_pipeline(json: &str) -> Result<Vec<Value>, String> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| format!("invalid pipeline JSON: {e}"))?;
    match value {
        Value::Array(stages) => Ok(stages),
        _ => Err("invalid pipeline JSON: expected an array of stages".into()),
    }
}
