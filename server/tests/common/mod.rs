//! Shared helpers for the HTTP integration tests

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use docbridge_server::{
    ConnectorAppState, ConnectorResponse, DocumentFacade, MemoryStore, SessionManager,
    connector_routes,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;

/// Router backed by a fresh in-memory store
pub fn create_test_app() -> Router {
    create_test_app_with_sessions().0
}

/// Router plus a handle on its session registry
pub fn create_test_app_with_sessions() -> (Router, Arc<SessionManager>) {
    let sessions = Arc::new(SessionManager::new());
    let facade = Arc::new(DocumentFacade::new(
        Arc::new(MemoryStore::new()),
        Arc::clone(&sessions),
    ));
    let router = Router::new().nest("/api", connector_routes(ConnectorAppState { facade }));
    (router, sessions)
}

/// Per-request config fragment
pub fn test_config(auto_commit: bool) -> Value {
    json!({
        "connectionString": "mem://test",
        "databaseName": "app",
        "collectionName": "orders",
        "autoCommitTransactions": auto_commit,
    })
}

/// POST a JSON body and decode the uniform connector response
pub async fn post_json(app: &Router, uri: &str, body: Value) -> ConnectorResponse {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
