use serde::{Deserialize, Serialize};

/// Connection settings and transaction policy for a single connector call.
///
/// Every operation is stateless and carries its own config; the host platform
/// sends the same structure with each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfig {
    /// Backing store connection string
    pub connection_string: String,
    /// Database name
    pub database_name: String,
    /// Collection name
    pub collection_name: String,
    /// Maximum connection pool size (values < 1 are replaced by the default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pool_size: Option<i64>,
    /// Connect timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    /// Whether to connect over TLS
    #[serde(default = "default_true")]
    pub use_ssl: bool,
    /// Default transaction timeout in seconds (values <= 0 fall back to the
    /// registry default)
    #[serde(default = "default_transaction_timeout")]
    pub transaction_default_timeout_secs: i64,
    /// When true and no session id is supplied, operations commit immediately
    #[serde(default = "default_true")]
    pub auto_commit_transactions: bool,
}

const DEFAULT_MAX_POOL_SIZE: i64 = 100;

fn default_true() -> bool {
    true
}

fn default_transaction_timeout() -> i64 {
    30
}

impl ConnectorConfig {
    /// Pool size with out-of-range values clamped to the default.
    pub fn effective_pool_size(&self) -> i64 {
        match self.max_pool_size {
            Some(n) if n >= 1 => n,
            _ => DEFAULT_MAX_POOL_SIZE,
        }
    }
}

/// Uniform response returned by every connector operation.
///
/// Expected failures (not-found sessions, driver errors, malformed payloads)
/// are reported through `success`/`message`, never as a transport error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorResponse {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable result description
    pub message: String,
    /// Result payload as a JSON string, empty when not applicable
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    /// Session id of the pending transaction, empty when not applicable
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_id: String,
    /// True when the caller still owes a commit or abort for this session
    #[serde(default)]
    pub transaction_pending: bool,
}

impl ConnectorResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: String::new(),
            session_id: String::new(),
            transaction_pending: false,
        }
    }

    pub fn ok_with_data(message: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::ok(message)
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: String::new(),
            session_id: String::new(),
            transaction_pending: false,
        }
    }

    /// Attach the pending-transaction session id to this response.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self.transaction_pending = true;
        self
    }
}

/// Request: insert a document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub config: ConnectorConfig,
    /// Document as a JSON object string
    pub document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Request: fetch documents matching a filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentsRequest {
    pub config: ConnectorConfig,
    /// Filter as a JSON object string; empty matches everything
    #[serde(default)]
    pub filter: String,
}

/// Request: fetch a page of documents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPagedDocumentsRequest {
    pub config: ConnectorConfig,
    #[serde(default)]
    pub skip: usize,
    pub limit: usize,
}

/// Request: fetch a single document by its id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentByIdRequest {
    pub config: ConnectorConfig,
    pub document_id: String,
}

/// Request: update documents matching a filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    pub config: ConnectorConfig,
    pub filter: String,
    /// Update specification as a JSON object string (`$set` / `$unset`)
    pub update: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Request: delete documents matching a filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDocumentRequest {
    pub config: ConnectorConfig,
    pub filter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Request: count documents matching a filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountDocumentsRequest {
    pub config: ConnectorConfig,
    #[serde(default)]
    pub filter: String,
}

/// Request: check whether any document matches a filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentExistsRequest {
    pub config: ConnectorConfig,
    pub filter: String,
}

/// Request: run an aggregation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    pub config: ConnectorConfig,
    /// Pipeline as a JSON array string, e.g. `[{"$match": {...}}, ...]`
    pub pipeline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Request: explain an aggregation pipeline without running it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateExplainRequest {
    pub config: ConnectorConfig,
    pub pipeline: String,
    /// When true, request execution stats rather than just the plan
    #[serde(default)]
    pub verbose: bool,
}

/// Request: collection statistics or index listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRequest {
    pub config: ConnectorConfig,
}

/// Request: commit or abort a pending transaction.
///
/// `config` is accepted for interface symmetry with the other operations but
/// is not consulted by the finalization logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub config: ConnectorConfig,
    pub session_id: String,
}
