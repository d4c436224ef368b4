//! Server-side session records.
//!
//! One record per active login, binding a subject to the fingerprints of
//! its currently valid token pair. Sessions are what make revocation
//! possible independent of token expiry: logout and password change
//! delete them, refresh rotates them.
//!
//! The durable engine behind the trait is external to this crate; the
//! in-memory implementation below covers single-process deployments and
//! the test suite.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::ApiError;

/// SHA-256 hex digest of a token. Stores never see raw token text.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Connection metadata captured at login.
#[derive(Debug, Clone, Default)]
pub struct SessionMetadata {
    pub user_agent: Option<String>,
    pub origin_addr: Option<String>,
}

/// A live login session.
///
/// Invariant: at most one live refresh fingerprint per session id. A
/// refresh token that matches no record is invalid regardless of its
/// signature.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub subject_id: String,
    pub access_fingerprint: String,
    pub refresh_fingerprint: String,
    pub user_agent: Option<String>,
    pub origin_addr: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Storage contract for session records. The store exclusively owns its
/// map; no other component mutates session state directly.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a record with a fixed absolute lifetime independent of
    /// token expiry.
    async fn create_session(
        &self,
        subject_id: &str,
        access_token: &str,
        refresh_token: &str,
        metadata: SessionMetadata,
    ) -> Result<String, ApiError>;

    /// Atomically replace both fingerprints. The previous refresh token
    /// becomes unusable even if it has not yet expired.
    async fn rotate_session(
        &self,
        session_id: &str,
        new_access_token: &str,
        new_refresh_token: &str,
    ) -> Result<(), ApiError>;

    async fn find_by_refresh_token(
        &self,
        subject_id: &str,
        refresh_token: &str,
    ) -> Result<Option<SessionRecord>, ApiError>;

    async fn find_by_access_token(
        &self,
        subject_id: &str,
        access_token: &str,
    ) -> Result<Option<SessionRecord>, ApiError>;

    /// Invalidate every concurrent session for a subject. Returns the
    /// number of sessions removed.
    async fn delete_all_for_subject(&self, subject_id: &str) -> Result<u64, ApiError>;
}

/// In-memory session store keyed by session id.
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
    session_ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            session_ttl,
        }
    }

    /// Drop expired records. A background task runs this periodically.
    pub fn sweep_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, record| !record.is_expired());
        before - self.sessions.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(
        &self,
        subject_id: &str,
        access_token: &str,
        refresh_token: &str,
        metadata: SessionMetadata,
    ) -> Result<String, ApiError> {
        let id = Uuid::new_v4().to_string();
        let record = SessionRecord {
            id: id.clone(),
            subject_id: subject_id.to_string(),
            access_fingerprint: fingerprint(access_token),
            refresh_fingerprint: fingerprint(refresh_token),
            user_agent: metadata.user_agent,
            origin_addr: metadata.origin_addr,
            expires_at: Utc::now() + self.session_ttl,
        };
        self.sessions.insert(id.clone(), record);
        Ok(id)
    }

    async fn rotate_session(
        &self,
        session_id: &str,
        new_access_token: &str,
        new_refresh_token: &str,
    ) -> Result<(), ApiError> {
        // Entry-level lock: both fingerprints change together. Two
        // concurrent rotations are last-write-wins; the loser's tokens
        // are immediately invalid.
        match self.sessions.get_mut(session_id) {
            Some(mut record) => {
                record.access_fingerprint = fingerprint(new_access_token);
                record.refresh_fingerprint = fingerprint(new_refresh_token);
                Ok(())
            }
            None => Err(ApiError::InvalidSession),
        }
    }

    async fn find_by_refresh_token(
        &self,
        subject_id: &str,
        refresh_token: &str,
    ) -> Result<Option<SessionRecord>, ApiError> {
        let wanted = fingerprint(refresh_token);
        Ok(self.sessions.iter().find_map(|entry| {
            let record = entry.value();
            if record.subject_id == subject_id
                && record.refresh_fingerprint == wanted
                && !record.is_expired()
            {
                Some(record.clone())
            } else {
                None
            }
        }))
    }

    async fn find_by_access_token(
        &self,
        subject_id: &str,
        access_token: &str,
    ) -> Result<Option<SessionRecord>, ApiError> {
        let wanted = fingerprint(access_token);
        Ok(self.sessions.iter().find_map(|entry| {
            let record = entry.value();
            if record.subject_id == subject_id
                && record.access_fingerprint == wanted
                && !record.is_expired()
            {
                Some(record.clone())
            } else {
                None
            }
        }))
    }

    async fn delete_all_for_subject(&self, subject_id: &str) -> Result<u64, ApiError> {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, record| record.subject_id != subject_id);
        Ok((before - self.sessions.len()) as u64)
    }
}
