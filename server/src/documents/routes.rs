//! HTTP route handlers for the connector API
//!
//! Every handler returns HTTP 200 with a `ConnectorResponse`; expected
//! failures are reported through the `success` flag, never as an error
//! status (the host platform inspects the body, not the status line).

use axum::{Json, Router, extract::State, routing::post};
use std::sync::Arc;

use super::facade::DocumentFacade;
use crate::protocol::{
    AggregateExplainRequest, AggregateRequest, CollectionRequest, ConnectorResponse,
    CountDocumentsRequest, CreateDocumentRequest, DeleteDocumentRequest, DocumentExistsRequest,
    GetDocumentByIdRequest, GetDocumentsRequest, GetPagedDocumentsRequest, TransactionRequest,
    UpdateDocumentRequest,
};

/// Application state containing the operation facade
#[derive(Clone)]
pub struct ConnectorAppState {
    pub facade: Arc<DocumentFacade>,
}

/// Build the connector API router
pub fn connector_routes(state: ConnectorAppState) -> Router {
    Router::new()
        .route("/documents/create", post(create_document))
        .route("/documents/query", post(get_documents))
        .route("/documents/query/paged", post(get_paged_documents))
        .route("/documents/get-by-id", post(get_document_by_id))
        .route("/documents/update", post(update_document))
        .route("/documents/delete", post(delete_document))
        .route("/documents/count", post(count_documents))
        .route("/documents/exists", post(document_exists))
        .route("/aggregate/run", post(aggregate_collection))
        .route("/aggregate/explain", post(aggregate_explain))
        .route("/collection/stats", post(get_collection_stats))
        .route("/collection/indexes", post(get_index_info))
        .route("/transactions/commit", post(commit_transaction))
        .route("/transactions/abort", post(abort_transaction))
        .with_state(state)
}

/// POST /documents/create - Insert a document
async fn create_document(
    State(state): State<ConnectorAppState>,
    Json(request): Json<CreateDocumentRequest>,
) -> Json<ConnectorResponse> {
    Json(
        state
            .facade
            .create_document(
                &request.config,
                &request.document,
                request.session_id.as_deref(),
            )
            .await,
    )
}

/// POST /documents/query - Fetch documents matching a filter
async fn get_documents(
    State(state): State<ConnectorAppState>,
    Json(request): Json<GetDocumentsRequest>,
) -> Json<ConnectorResponse> {
    Json(
        state
            .facade
            .get_documents(&request.config, &request.filter)
            .await,
    )
}

/// POST /documents/query/paged - Fetch a page of documents
async fn get_paged_documents(
    State(state): State<ConnectorAppState>,
    Json(request): Json<GetPagedDocumentsRequest>,
) -> Json<ConnectorResponse> {
    Json(
        state
            .facade
            .get_paged_documents(&request.config, request.skip, request.limit)
            .await,
    )
}

/// POST /documents/get-by-id - Fetch a single document by id
async fn get_document_by_id(
    State(state): State<ConnectorAppState>,
    Json(request): Json<GetDocumentByIdRequest>,
) -> Json<ConnectorResponse> {
    Json(
        state
            .facade
            .get_document_by_id(&request.config, &request.document_id)
            .await,
    )
}

/// POST /documents/update - Update the first matching document
async fn update_document(
    State(state): State<ConnectorAppState>,
    Json(request): Json<UpdateDocumentRequest>,
) -> Json<ConnectorResponse> {
    Json(
        state
            .facade
            .update_document(
                &request.config,
                &request.filter,
                &request.update,
                request.session_id.as_deref(),
            )
            .await,
    )
}

/// POST /documents/delete - Delete the first matching document
async fn delete_document(
    State(state): State<ConnectorAppState>,
    Json(request): Json<DeleteDocumentRequest>,
) -> Json<ConnectorResponse> {
    Json(
        state
            .facade
            .delete_document(
                &request.config,
                &request.filter,
                request.session_id.as_deref(),
            )
            .await,
    )
}

/// POST /documents/count - Count matching documents
async fn count_documents(
    State(state): State<ConnectorAppState>,
    Json(request): Json<CountDocumentsRequest>,
) -> Json<ConnectorResponse> {
    Json(
        state
            .facade
            .count_documents(&request.config, &request.filter)
            .await,
    )
}

/// POST /documents/exists - Check whether any document matches
async fn document_exists(
    State(state): State<ConnectorAppState>,
    Json(request): Json<DocumentExistsRequest>,
) -> Json<ConnectorResponse> {
    Json(
        state
            .facade
            .document_exists(&request.config, &request.filter)
            .await,
    )
}

/// POST /aggregate/run - Run an aggregation pipeline
async fn aggregate_collection(
    State(state): State<ConnectorAppState>,
    Json(request): Json<AggregateRequest>,
) -> Json<ConnectorResponse> {
    Json(
        state
            .facade
            .aggregate_collection(
                &request.config,
                &request.pipeline,
                request.session_id.as_deref(),
            )
            .await,
    )
}

/// POST /aggregate/explain - Explain an aggregation pipeline
async fn aggregate_explain(
    State(state): State<ConnectorAppState>,
    Json(request): Json<AggregateExplainRequest>,
) -> Json<ConnectorResponse> {
    Json(
        state
            .facade
            .aggregate_explain(&request.config, &request.pipeline, request.verbose)
            .await,
    )
}

/// POST /collection/stats - Collection statistics
async fn get_collection_stats(
    State(state): State<ConnectorAppState>,
    Json(request): Json<CollectionRequest>,
) -> Json<ConnectorResponse> {
    Json(state.facade.get_collection_stats(&request.config).await)
}

/// POST /collection/indexes - List collection indexes
async fn get_index_info(
    State(state): State<ConnectorAppState>,
    Json(request): Json<CollectionRequest>,
) -> Json<ConnectorResponse> {
    Json(state.facade.get_index_info(&request.config).await)
}

/// POST /transactions/commit - Commit a pending transaction
async fn commit_transaction(
    State(state): State<ConnectorAppState>,
    Json(request): Json<TransactionRequest>,
) -> Json<ConnectorResponse> {
    // request.config is accepted for interface symmetry only
    Json(state.facade.commit_transaction(&request.session_id).await)
}

/// POST /transactions/abort - Abort a pending transaction
async fn abort_transaction(
    State(state): State<ConnectorAppState>,
    Json(request): Json<TransactionRequest>,
) -> Json<ConnectorResponse> {
    Json(state.facade.abort_transaction(&request.session_id).await)
}
