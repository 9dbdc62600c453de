use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Longest session id kept; longer hints are cut.
pub const MAX_SESSION_ID_LEN: usize = 64;

/// A persisted refresh-token row. Only the SHA-256 of the raw token is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub token_hash: String,
    pub user_id: Uuid,
    pub session_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Only ever goes from false to true.
    pub revoked: bool,
}

impl RefreshTokenRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token_hash: String,
    pub user_id: Uuid,
    pub session_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of an issuance or rotation. `raw_token` is handed out once and never stored.
#[derive(Clone)]
pub struct IssuedRefreshToken {
    pub raw_token: String,
    pub user_id: Uuid,
    pub session_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedRefreshToken")
            .field("user_id", &self.user_id)
            .field("session_id", &self.session_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Public view of an active session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&RefreshTokenRecord> for SessionInfo {
    fn from(record: &RefreshTokenRecord) -> Self {
        Self {
            session_id: record.session_id.clone(),
            issued_at: record.issued_at,
            expires_at: record.expires_at,
        }
    }
}

/// Trims a caller-supplied session id and caps it at [`MAX_SESSION_ID_LEN`] chars.
/// Blank hints yield `None`.
pub fn normalize_session_id(hint: Option<&str>) -> Option<String> {
    let trimmed = hint?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_SESSION_ID_LEN).collect())
}
