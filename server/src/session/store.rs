//! Concurrent session record storage
//!
//! Maps opaque session ids to in-flight transaction records. Presence in this
//! store is the sole authority for "session exists"; expiry is evaluated by
//! the lifecycle manager after fetch.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use crate::driver::TransactionHandle;

/// Opaque session identifier issued by the registry
pub type SessionId = String;

/// One in-flight transaction: its backing handle and absolute deadline
#[derive(Clone)]
pub struct SessionRecord {
    pub handle: Arc<dyn TransactionHandle>,
    pub expires_at: Instant,
}

impl SessionRecord {
    /// Strictly-greater rule: a record whose deadline equals `now` is expired.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Thread-safe registry of session records.
///
/// All operations are safe from arbitrarily many concurrent callers; `remove`
/// is atomic per key, so under racing finalizations the first caller takes
/// ownership of the handle and later callers observe "not found".
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionRecord>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Pure lookup; does not evaluate or enforce expiry.
    pub fn try_get(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.get(session_id).map(|r| r.value().clone())
    }

    /// Install a new record. Ids are generated to be unique, so this never
    /// overwrites.
    pub fn insert(&self, session_id: SessionId, record: SessionRecord) {
        self.sessions.insert(session_id, record);
    }

    /// Atomically remove and return the record, transferring handle
    /// ownership to the caller.
    pub fn remove(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.remove(session_id).map(|(_, record)| record)
    }

    /// Ids of records whose deadline has passed at `now`.
    pub fn expired_ids(&self, now: Instant) -> Vec<SessionId> {
        self.sessions
            .iter()
            .filter(|entry| !entry.value().is_valid_at(now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
