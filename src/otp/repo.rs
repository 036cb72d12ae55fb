//! In-memory stores for pending codes and sessions.
//!
//! Each store is a single map behind an async mutex; every read-check-write
//! sequence runs under one lock acquisition.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::error::AuthError;

pub(super) struct PendingOtp {
    pub(super) code: SecretString,
    pub(super) expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub(super) struct OtpRepo {
    pending: Mutex<HashMap<String, PendingOtp>>,
}

impl OtpRepo {
    /// Store a code for `email`, replacing any prior pending code.
    /// Expired codes stay until their own verification reports them.
    pub(super) async fn put(&self, email: &str, otp: PendingOtp) {
        self.pending.lock().await.insert(email.to_string(), otp);
    }

    /// Check `submitted` against the pending code and consume it on match.
    pub(super) async fn consume(
        &self,
        email: &str,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut pending = self.pending.lock().await;
        let Some(entry) = pending.get(email) else {
            return Err(AuthError::NotFound);
        };

        if now > entry.expires_at {
            pending.remove(email);
            return Err(AuthError::Expired);
        }

        if entry.code.expose_secret() != submitted {
            return Err(AuthError::Mismatch);
        }

        pending.remove(email);
        Ok(())
    }

    pub(super) async fn expires_at(&self, email: &str) -> Option<DateTime<Utc>> {
        self.pending
            .lock()
            .await
            .get(email)
            .map(|entry| entry.expires_at)
    }

    pub(super) async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[derive(Clone, Debug)]
pub(super) struct SessionRecord {
    pub(super) email: String,
    pub(super) created_at: DateTime<Utc>,
    pub(super) expires_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

/// Sessions keyed by the SHA-256 hash of their bearer token.
#[derive(Default)]
pub(super) struct SessionRepo {
    sessions: Mutex<HashMap<Vec<u8>, SessionRecord>>,
}

impl SessionRepo {
    pub(super) async fn insert(&self, token_hash: Vec<u8>, record: SessionRecord) {
        let now = record.created_at;
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| !entry.is_expired(now));
        sessions.insert(token_hash, record);
    }

    /// Resolve a live session, purging it if it has expired.
    pub(super) async fn lookup(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Option<SessionRecord> {
        let mut sessions = self.sessions.lock().await;
        let record = sessions.get(token_hash)?;
        if record.is_expired(now) {
            sessions.remove(token_hash);
            return None;
        }
        Some(record.clone())
    }

    pub(super) async fn remove(&self, token_hash: &[u8]) -> bool {
        self.sessions.lock().await.remove(token_hash).is_some()
    }

    pub(super) async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
