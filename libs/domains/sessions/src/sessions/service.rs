use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{
    IssuedRefreshToken, NewRefreshToken, RefreshTokenRecord, SessionInfo, normalize_session_id,
};
use super::repository::SessionRepository;
use crate::clock::{SharedClock, to_delta};
use crate::config::SessionConfig;
use crate::crypto::{random_url_token, sha256_hex};
use crate::error::{SessionError, SessionResult};

/// Issues, rotates and caps refresh-token sessions.
///
/// A record is ACTIVE until it is revoked or its `expires_at` passes; both are
/// terminal. The raw token only exists in the value returned to the caller.
pub struct SessionManager<R: SessionRepository + ?Sized = dyn SessionRepository> {
    repository: Arc<R>,
    config: SessionConfig,
    clock: SharedClock,
}

impl<R: SessionRepository + ?Sized> Clone for SessionManager<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            config: self.config.clone(),
            clock: self.clock.clone(),
        }
    }
}

fn generate_session_id() -> String {
    let mut buf = [0u8; 16];
    rand::rng().fill_bytes(&mut buf);
    format!("sess-{}", URL_SAFE_NO_PAD.encode(buf))
}

impl<R: SessionRepository + ?Sized> SessionManager<R> {
    pub fn new(repository: Arc<R>, config: SessionConfig, clock: SharedClock) -> Self {
        Self {
            repository,
            config: config.normalized(),
            clock,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Persists a new session for `user_id`, then enforces the session cap so
    /// the new record counts as the newest.
    #[instrument(skip(self, session_hint))]
    pub async fn issue(
        &self,
        user_id: Uuid,
        session_hint: Option<&str>,
    ) -> SessionResult<IssuedRefreshToken> {
        let session_id = normalize_session_id(session_hint).unwrap_or_else(generate_session_id);
        let raw_token = random_url_token(self.config.token_bytes);
        let issued_at = self.clock.now();
        let expires_at = issued_at + to_delta(self.config.session_lifetime());

        let record = self
            .repository
            .insert(NewRefreshToken {
                token_hash: sha256_hex(&raw_token),
                user_id,
                session_id: session_id.clone(),
                issued_at,
                expires_at,
            })
            .await?;

        self.enforce_session_cap(user_id).await?;

        debug!(record_id = record.id, %session_id, "Refresh session issued");
        Ok(IssuedRefreshToken {
            raw_token,
            user_id,
            session_id,
            issued_at,
            expires_at,
        })
    }

    /// Exchanges a raw refresh token for a new one on the same session.
    ///
    /// When `session_id` is supplied it must match the record's session id.
    /// Of two concurrent rotations of one token, only one succeeds.
    #[instrument(skip_all)]
    pub async fn validate_and_rotate(
        &self,
        raw_token: &str,
        session_id: Option<&str>,
    ) -> SessionResult<IssuedRefreshToken> {
        if raw_token.trim().is_empty() {
            return Err(SessionError::InvalidOrExpiredToken);
        }
        let now = self.clock.now();

        let record = self
            .repository
            .find_active_by_hash(&sha256_hex(raw_token), now)
            .await?
            .ok_or(SessionError::InvalidOrExpiredToken)?;

        if let Some(expected) = normalize_session_id(session_id)
            && expected != record.session_id
        {
            warn!(record_id = record.id, "Refresh token presented with another session id");
            return Err(SessionError::DeviceMismatch);
        }

        if !self.repository.revoke_if_active(record.id, now).await? {
            info!(record_id = record.id, "Refresh token already rotated");
            return Err(SessionError::InvalidOrExpiredToken);
        }

        self.issue(record.user_id, Some(&record.session_id)).await
    }

    /// Revokes the session behind `raw_token`. False if it was not active.
    #[instrument(skip_all)]
    pub async fn revoke_token(&self, raw_token: &str) -> SessionResult<bool> {
        let now = self.clock.now();
        match self
            .repository
            .find_active_by_hash(&sha256_hex(raw_token), now)
            .await?
        {
            Some(record) => self.repository.revoke_if_active(record.id, now).await,
            None => Ok(false),
        }
    }

    /// Idempotent.
    #[instrument(skip(self))]
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> SessionResult<u64> {
        let revoked = self
            .repository
            .revoke_all_for_user(user_id, self.clock.now())
            .await?;
        info!(revoked, "Revoked all sessions for user");
        Ok(revoked)
    }

    /// Idempotent. A blank session id matches nothing.
    #[instrument(skip(self))]
    pub async fn revoke_all_for_user_session(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> SessionResult<u64> {
        let Some(session_id) = normalize_session_id(Some(session_id)) else {
            return Ok(0);
        };
        self.repository
            .revoke_all_for_user_session(user_id, &session_id, self.clock.now())
            .await
    }

    pub async fn active_sessions(&self, user_id: Uuid) -> SessionResult<Vec<SessionInfo>> {
        let mut active = self
            .repository
            .list_active_for_user(user_id, self.clock.now())
            .await?;
        sort_newest_first(&mut active);
        Ok(active.iter().map(SessionInfo::from).collect())
    }

    /// Deletes expired or revoked rows issued no later than `as_of`.
    pub async fn purge_expired_and_revoked(&self, as_of: DateTime<Utc>) -> SessionResult<u64> {
        self.repository.purge(as_of).await
    }

    pub async fn purge_now(&self) -> SessionResult<u64> {
        self.purge_expired_and_revoked(self.clock.now()).await
    }

    /// Keeps the newest `max_sessions` active records and revokes the rest.
    async fn enforce_session_cap(&self, user_id: Uuid) -> SessionResult<()> {
        let now = self.clock.now();
        let mut active = self.repository.list_active_for_user(user_id, now).await?;
        if active.len() <= self.config.max_sessions {
            return Ok(());
        }

        sort_newest_first(&mut active);
        let mut evicted = 0;
        for record in active.iter().skip(self.config.max_sessions) {
            if self.repository.revoke_if_active(record.id, now).await? {
                evicted += 1;
            }
        }
        info!(
            %user_id,
            evicted,
            max_sessions = self.config.max_sessions,
            "Session cap enforced"
        );
        Ok(())
    }
}

fn sort_newest_first(records: &mut [RefreshTokenRecord]) {
    records.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then(b.id.cmp(&a.id)));
}
