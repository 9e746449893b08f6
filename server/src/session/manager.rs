//! Transaction session lifecycle manager
//!
//! The state machine behind multi-step transactions over stateless calls: a
//! session is created by `resolve_or_create`, resumed by the same call with
//! its id, and destroyed by commit, abort, or expiry. Expired records are
//! evicted lazily on lookup; a periodic `cleanup_expired` sweep keeps the
//! registry from accumulating abandoned sessions in between.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::driver::{DocumentStore, StoreError, TransactionHandle};
use crate::protocol::ConnectorConfig;

use super::store::{SessionId, SessionRecord, SessionStore};

/// Session lifecycle errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found or already finalized: {0}")]
    NotFound(SessionId),

    #[error("Commit failed: {0}")]
    CommitFailed(StoreError),

    #[error("Abort failed: {0}")]
    AbortFailed(StoreError),

    #[error("Failed to start transaction: {0}")]
    Begin(#[from] StoreError),
}

/// Session registry configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// TTL applied when a caller requests a timeout of zero or less
    pub default_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(300),
        }
    }
}

/// Session manager: owns the registry and all lifecycle transitions
pub struct SessionManager {
    store: SessionStore,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            store: SessionStore::new(),
            config,
        }
    }

    /// Resume the session identified by `requested`, or start a fresh one.
    ///
    /// A missing, empty, unknown, or expired id falls through to creation; a
    /// stale record found on the way is evicted and its handle released.
    /// `timeout_secs <= 0` is replaced by the configured default.
    pub async fn resolve_or_create(
        &self,
        store: &dyn DocumentStore,
        config: &ConnectorConfig,
        requested: Option<&str>,
        timeout_secs: i64,
    ) -> Result<(Arc<dyn TransactionHandle>, SessionId), SessionError> {
        let ttl = if timeout_secs > 0 {
            Duration::from_secs(timeout_secs as u64)
        } else {
            self.config.default_timeout
        };
        self.resolve_or_create_with_ttl(store, config, requested, ttl)
            .await
    }

    /// `resolve_or_create` with an explicit TTL (no clamping).
    pub async fn resolve_or_create_with_ttl(
        &self,
        store: &dyn DocumentStore,
        config: &ConnectorConfig,
        requested: Option<&str>,
        ttl: Duration,
    ) -> Result<(Arc<dyn TransactionHandle>, SessionId), SessionError> {
        if let Some(id) = requested.filter(|id| !id.is_empty()) {
            if let Some(record) = self.store.try_get(id) {
                if record.is_valid_at(Instant::now()) {
                    debug!("Resumed session {}", id);
                    return Ok((record.handle, id.to_string()));
                }
                // Stale record under the requested id: evict, then create
                drop(record);
                self.evict(id);
            }
        }

        let handle = store.begin_transaction(config).await?;
        let session_id = Uuid::new_v4().to_string();
        self.store.insert(
            session_id.clone(),
            SessionRecord {
                handle: Arc::clone(&handle),
                expires_at: Instant::now() + ttl,
            },
        );
        counter!("docbridge_sessions_created_total").increment(1);
        info!("Started transaction session {} (ttl {:?})", session_id, ttl);
        Ok((handle, session_id))
    }

    /// Commit the session's transaction and release its handle.
    ///
    /// The record is removed before the driver call, so a failed commit still
    /// ends the session; it cannot be resumed or retried.
    pub async fn commit(&self, session_id: &str) -> Result<String, SessionError> {
        let record = self
            .store
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let result = record.handle.commit().await;
        // Handle released when `record` drops, commit outcome notwithstanding
        drop(record);

        match result {
            Ok(()) => {
                counter!("docbridge_sessions_committed_total").increment(1);
                info!("Committed transaction session {}", session_id);
                Ok("Transaction committed.".to_string())
            }
            Err(e) => {
                warn!("Commit failed for session {}: {}", session_id, e);
                Err(SessionError::CommitFailed(e))
            }
        }
    }

    /// Abort the session's transaction and release its handle.
    pub async fn abort(&self, session_id: &str) -> Result<String, SessionError> {
        let record = self
            .store
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let result = record.handle.abort().await;
        drop(record);

        match result {
            Ok(()) => {
                counter!("docbridge_sessions_aborted_total").increment(1);
                info!("Aborted transaction session {}", session_id);
                Ok("Transaction aborted.".to_string())
            }
            Err(e) => {
                warn!("Abort failed for session {}: {}", session_id, e);
                Err(SessionError::AbortFailed(e))
            }
        }
    }

    /// Silently remove an expired record. Expiry is an expected condition,
    /// so nothing is reported to the caller.
    fn evict(&self, session_id: &str) {
        if self.store.remove(session_id).is_some() {
            counter!("docbridge_sessions_expired_total").increment(1);
            debug!("Evicted expired session {}", session_id);
        }
    }

    /// Remove all records whose deadline has passed. Lazy eviction at lookup
    /// remains authoritative; this sweep only bounds how long an abandoned
    /// session occupies the registry.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let expired = self.store.expired_ids(now);
        let mut removed = 0;
        for id in expired {
            if self.store.remove(&id).is_some() {
                counter!("docbridge_sessions_expired_total").increment(1);
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Swept {} expired transaction sessions", removed);
        }
        removed
    }

    /// Number of registered (not necessarily still valid) sessions
    pub fn session_count(&self) -> usize {
        self.store.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockStore, test_config};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_new_sessions_get_distinct_ids() {
        let manager = SessionManager::new();
        let store = MockStore::new();
        let config = test_config();

        let (_h1, id1) = manager
            .resolve_or_create(&store, &config, None, 30)
            .await
            .unwrap();
        let (_h2, id2) = manager
            .resolve_or_create(&store, &config, None, 30)
            .await
            .unwrap();

        assert_ne!(id1, id2);
        assert_eq!(manager.session_count(), 2);
        assert_eq!(store.begun.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_resumes_same_handle() {
        let manager = SessionManager::new();
        let store = MockStore::new();
        let config = test_config();

        let (h1, id1) = manager
            .resolve_or_create(&store, &config, None, 30)
            .await
            .unwrap();
        let (h2, id2) = manager
            .resolve_or_create(&store, &config, Some(&id1), 30)
            .await
            .unwrap();

        assert_eq!(id1, id2);
        assert_eq!(h1.token(), h2.token());
        // No second transaction was started
        assert_eq!(store.begun.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_creates_fresh_session() {
        let manager = SessionManager::new();
        let store = MockStore::new();
        let config = test_config();

        let (_handle, id) = manager
            .resolve_or_create(&store, &config, Some("never-issued"), 30)
            .await
            .unwrap();

        assert_ne!(id, "never-issued");
        assert_eq!(manager.session_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_evicted_and_replaced() {
        let manager = SessionManager::new();
        let store = MockStore::new();
        let config = test_config();

        let (h1, id1) = manager
            .resolve_or_create_with_ttl(&store, &config, None, Duration::from_millis(5))
            .await
            .unwrap();
        drop(h1);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (h2, id2) = manager
            .resolve_or_create_with_ttl(&store, &config, Some(&id1), Duration::from_secs(30))
            .await
            .unwrap();

        assert_ne!(id1, id2);
        assert_eq!(manager.session_count(), 1);
        drop(h2);
        // The stale handle was released exactly once
        assert_eq!(store.handle_drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_timeout_uses_configured_default() {
        let manager = SessionManager::with_config(SessionConfig {
            default_timeout: Duration::from_millis(5),
        });
        let store = MockStore::new();
        let config = test_config();

        let (h1, id1) = manager
            .resolve_or_create(&store, &config, None, 0)
            .await
            .unwrap();
        drop(h1);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (_h2, id2) = manager
            .resolve_or_create(&store, &config, Some(&id1), 30)
            .await
            .unwrap();
        assert_ne!(id1, id2);
    }

    #[tokio::test]
    async fn test_commit_is_idempotent_failure_on_second_call() {
        let manager = SessionManager::new();
        let store = MockStore::new();
        let config = test_config();

        let (handle, id) = manager
            .resolve_or_create(&store, &config, None, 30)
            .await
            .unwrap();
        drop(handle);

        let message = manager.commit(&id).await.unwrap();
        assert_eq!(message, "Transaction committed.");
        assert_eq!(store.commits.load(Ordering::SeqCst), 1);
        assert_eq!(store.handle_drops.load(Ordering::SeqCst), 1);

        let second = manager.commit(&id).await;
        assert!(matches!(second, Err(SessionError::NotFound(_))));
        // Not committed or released a second time
        assert_eq!(store.commits.load(Ordering::SeqCst), 1);
        assert_eq!(store.handle_drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_committed_session_cannot_be_aborted() {
        let manager = SessionManager::new();
        let store = MockStore::new();
        let config = test_config();

        let (handle, id) = manager
            .resolve_or_create(&store, &config, None, 30)
            .await
            .unwrap();
        drop(handle);

        manager.commit(&id).await.unwrap();
        let abort = manager.abort(&id).await;
        assert!(matches!(abort, Err(SessionError::NotFound(_))));
        assert_eq!(store.aborts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_aborted_session_cannot_be_committed() {
        let manager = SessionManager::new();
        let store = MockStore::new();
        let config = test_config();

        let (handle, id) = manager
            .resolve_or_create(&store, &config, None, 30)
            .await
            .unwrap();
        drop(handle);

        manager.abort(&id).await.unwrap();
        let commit = manager.commit(&id).await;
        assert!(matches!(commit, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_commit_still_removes_and_releases() {
        let manager = SessionManager::new();
        let store = MockStore::failing_commit();
        let config = test_config();

        let (handle, id) = manager
            .resolve_or_create(&store, &config, None, 30)
            .await
            .unwrap();
        drop(handle);

        let result = manager.commit(&id).await;
        assert!(matches!(result, Err(SessionError::CommitFailed(_))));
        assert_eq!(manager.session_count(), 0);
        assert_eq!(store.handle_drops.load(Ordering::SeqCst), 1);

        // The session cannot be resumed after a failed commit
        let retry = manager.commit(&id).await;
        assert!(matches!(retry, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cleanup_expired_sweeps_stale_sessions() {
        let manager = SessionManager::new();
        let store = MockStore::new();
        let config = test_config();

        let (h1, _) = manager
            .resolve_or_create_with_ttl(&store, &config, None, Duration::from_millis(5))
            .await
            .unwrap();
        let (h2, _) = manager
            .resolve_or_create_with_ttl(&store, &config, None, Duration::from_secs(60))
            .await
            .unwrap();
        drop(h1);
        drop(h2);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let removed = manager.cleanup_expired();

        assert_eq!(removed, 1);
        assert_eq!(manager.session_count(), 1);
        assert_eq!(store.handle_drops.load(Ordering::SeqCst), 1);
    }

    /// End-to-end lifecycle: create, resume, commit, double-commit.
    #[tokio::test]
    async fn test_full_session_lifecycle() {
        let manager = SessionManager::new();
        let store = MockStore::new();
        let config = test_config();

        let (h1, id) = manager
            .resolve_or_create(&store, &config, None, 30)
            .await
            .unwrap();
        let (h2, resumed) = manager
            .resolve_or_create(&store, &config, Some(&id), 30)
            .await
            .unwrap();
        assert_eq!(id, resumed);
        assert_eq!(h1.token(), h2.token());
        drop(h1);
        drop(h2);

        assert!(manager.commit(&id).await.is_ok());
        assert_eq!(store.handle_drops.load(Ordering::SeqCst), 1);
        assert!(matches!(
            manager.commit(&id).await,
            Err(SessionError::NotFound(_))
        ));
    }
}
