use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{NewRefreshToken, RefreshTokenRecord};
use crate::error::{SessionError, SessionResult};

/// Persistence for refresh-token sessions.
///
/// `revoke_if_active` must be a single conditional write: it is what keeps two
/// concurrent rotations of the same token from both succeeding.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, record: NewRefreshToken) -> SessionResult<RefreshTokenRecord>;

    /// Unrevoked row with this hash whose `expires_at` is after `now`.
    async fn find_active_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> SessionResult<Option<RefreshTokenRecord>>;

    /// Flips `revoked` only if the row is still active. Returns whether it did.
    async fn revoke_if_active(&self, id: i64, now: DateTime<Utc>) -> SessionResult<bool>;

    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> SessionResult<Vec<RefreshTokenRecord>>;

    async fn revoke_all_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> SessionResult<u64>;

    async fn revoke_all_for_user_session(
        &self,
        user_id: Uuid,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> SessionResult<u64>;

    /// Deletes rows that are expired before `as_of` or revoked, skipping rows
    /// issued after `as_of`.
    async fn purge(&self, as_of: DateTime<Utc>) -> SessionResult<u64>;
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    rows: BTreeMap<i64, RefreshTokenRecord>,
}

/// In-memory implementation of SessionRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionRepository {
    state: Arc<RwLock<State>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row, revoked and expired included.
    pub async fn all(&self) -> Vec<RefreshTokenRecord> {
        self.state.read().await.rows.values().cloned().collect()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, record: NewRefreshToken) -> SessionResult<RefreshTokenRecord> {
        let mut state = self.state.write().await;

        if state.rows.values().any(|r| r.token_hash == record.token_hash) {
            return Err(SessionError::Database(
                "duplicate key value violates unique constraint on token_hash".to_string(),
            ));
        }

        state.next_id += 1;
        let row = RefreshTokenRecord {
            id: state.next_id,
            token_hash: record.token_hash,
            user_id: record.user_id,
            session_id: record.session_id,
            issued_at: record.issued_at,
            expires_at: record.expires_at,
            revoked: false,
        };
        state.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_active_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> SessionResult<Option<RefreshTokenRecord>> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .values()
            .find(|r| r.token_hash == token_hash && r.is_active(now))
            .cloned())
    }

    async fn revoke_if_active(&self, id: i64, now: DateTime<Utc>) -> SessionResult<bool> {
        let mut state = self.state.write().await;
        match state.rows.get_mut(&id) {
            Some(row) if row.is_active(now) => {
                row.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> SessionResult<Vec<RefreshTokenRecord>> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .values()
            .filter(|r| r.user_id == user_id && r.is_active(now))
            .cloned()
            .collect())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> SessionResult<u64> {
        let mut state = self.state.write().await;
        let mut count = 0;
        for row in state.rows.values_mut() {
            if row.user_id == user_id && row.is_active(now) {
                row.revoked = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn revoke_all_for_user_session(
        &self,
        user_id: Uuid,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> SessionResult<u64> {
        let mut state = self.state.write().await;
        let mut count = 0;
        for row in state.rows.values_mut() {
            if row.user_id == user_id && row.session_id == session_id && row.is_active(now) {
                row.revoked = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn purge(&self, as_of: DateTime<Utc>) -> SessionResult<u64> {
        let mut state = self.state.write().await;
        let before = state.rows.len();
        state
            .rows
            .retain(|_, r| !((r.expires_at < as_of || r.revoked) && r.issued_at <= as_of));
        Ok((before - state.rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn new_row(hash: &str, user_id: Uuid, issued_at: DateTime<Utc>, ttl_secs: i64) -> NewRefreshToken {
        NewRefreshToken {
            token_hash: hash.to_string(),
            user_id,
            session_id: "sess-a".to_string(),
            issued_at,
            expires_at: issued_at + TimeDelta::seconds(ttl_secs),
        }
    }

    #[tokio::test]
    async fn test_duplicate_hash_rejected() {
        let repo = InMemorySessionRepository::new();
        let user = Uuid::new_v4();
        let now = Utc::now();

        repo.insert(new_row("h1", user, now, 60)).await.unwrap();
        let err = repo.insert(new_row("h1", user, now, 60)).await.unwrap_err();

        assert!(matches!(err, SessionError::Database(_)));
    }

    #[tokio::test]
    async fn test_revoke_if_active_only_once() {
        let repo = InMemorySessionRepository::new();
        let now = Utc::now();
        let row = repo
            .insert(new_row("h1", Uuid::new_v4(), now, 60))
            .await
            .unwrap();

        assert!(repo.revoke_if_active(row.id, now).await.unwrap());
        assert!(!repo.revoke_if_active(row.id, now).await.unwrap());
        assert!(repo.find_active_by_hash("h1", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_row_is_not_active() {
        let repo = InMemorySessionRepository::new();
        let now = Utc::now();
        let row = repo
            .insert(new_row("h1", Uuid::new_v4(), now, 60))
            .await
            .unwrap();
        let later = now + TimeDelta::seconds(60);

        assert!(repo.find_active_by_hash("h1", later).await.unwrap().is_none());
        assert!(!repo.revoke_if_active(row.id, later).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_spares_rows_issued_after_as_of() {
        let repo = InMemorySessionRepository::new();
        let user = Uuid::new_v4();
        let as_of = Utc::now();

        let expired = repo
            .insert(new_row("expired", user, as_of - TimeDelta::seconds(120), 60))
            .await
            .unwrap();
        let revoked = repo.insert(new_row("revoked", user, as_of, 600)).await.unwrap();
        repo.revoke_if_active(revoked.id, as_of).await.unwrap();
        let late = repo
            .insert(new_row("late", user, as_of + TimeDelta::seconds(1), 600))
            .await
            .unwrap();
        repo.revoke_if_active(late.id, as_of).await.unwrap();
        repo.insert(new_row("live", user, as_of, 600)).await.unwrap();

        let purged = repo.purge(as_of).await.unwrap();

        assert_eq!(purged, 2);
        let remaining: Vec<_> = repo.all().await.into_iter().map(|r| r.id).collect();
        assert!(!remaining.contains(&expired.id));
        assert!(!remaining.contains(&revoked.id));
        assert!(remaining.contains(&late.id));
    }

    #[tokio::test]
    async fn test_revoke_all_for_user_session_is_scoped() {
        let repo = InMemorySessionRepository::new();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let now = Utc::now();

        repo.insert(new_row("a", user, now, 60)).await.unwrap();
        repo.insert(NewRefreshToken {
            session_id: "sess-b".to_string(),
            ..new_row("b", user, now, 60)
        })
        .await
        .unwrap();
        repo.insert(new_row("c", other, now, 60)).await.unwrap();

        assert_eq!(
            repo.revoke_all_for_user_session(user, "sess-a", now)
                .await
                .unwrap(),
            1
        );
        assert_eq!(repo.list_active_for_user(user, now).await.unwrap().len(), 1);
        assert_eq!(repo.revoke_all_for_user(user, now).await.unwrap(), 1);
        assert_eq!(repo.revoke_all_for_user(user, now).await.unwrap(), 0);
        assert_eq!(repo.list_active_for_user(other, now).await.unwrap().len(), 1);
    }
}
