use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::models::{Account, normalize_email};
use super::store::AccountStore;
use crate::clock::{SharedClock, to_delta};
use crate::config::AccountCacheConfig;
use crate::error::SessionResult;

#[derive(Debug, Clone)]
struct CachedAccount {
    account: Account,
    cached_at: DateTime<Utc>,
}

/// Short-lived read-through cache over an [`AccountStore`], keyed by
/// normalized email.
///
/// Misses are never cached, so a newly created account is visible at once.
/// Call [`invalidate`](Self::invalidate) after changing role or lock flags.
pub struct CachedAccountStore<S: AccountStore + ?Sized = dyn AccountStore> {
    inner: Arc<S>,
    entries: RwLock<HashMap<String, CachedAccount>>,
    config: AccountCacheConfig,
    clock: SharedClock,
}

impl<S: AccountStore + ?Sized> CachedAccountStore<S> {
    pub fn new(inner: Arc<S>, config: AccountCacheConfig, clock: SharedClock) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            config,
            clock,
        }
    }

    pub async fn invalidate(&self, email: &str) {
        let Ok(key) = normalize_email(email) else {
            return;
        };
        if self.entries.write().await.remove(&key).is_some() {
            debug!("Account cache entry invalidated");
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn is_fresh(&self, entry: &CachedAccount, now: DateTime<Utc>) -> bool {
        entry.cached_at + to_delta(self.config.ttl) > now
    }

    async fn remember(&self, key: String, account: Account) {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        if entries.len() >= self.config.capacity && !entries.contains_key(&key) {
            entries.retain(|_, e| e.cached_at + to_delta(self.config.ttl) > now);
            if entries.len() >= self.config.capacity
                && let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.cached_at)
                    .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CachedAccount {
                account,
                cached_at: now,
            },
        );
    }
}

#[async_trait]
impl<S: AccountStore + ?Sized> AccountStore for CachedAccountStore<S> {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> SessionResult<Option<Account>> {
        let key = normalize_email(email)?;
        let now = self.clock.now();

        if let Some(entry) = self.entries.read().await.get(&key)
            && self.is_fresh(entry, now)
        {
            return Ok(Some(entry.account.clone()));
        }

        let found = self.inner.find_by_email(&key).await?;
        match &found {
            Some(account) => self.remember(key, account.clone()).await,
            None => {
                self.entries.write().await.remove(&key);
            }
        }
        Ok(found)
    }

    async fn find_by_id(&self, id: Uuid) -> SessionResult<Option<Account>> {
        self.inner.find_by_id(id).await
    }

    async fn create(&self, account: Account) -> SessionResult<Account> {
        let created = self.inner.create(account).await?;
        self.entries.write().await.remove(&created.email);
        Ok(created)
    }

    async fn mark_verified(&self, id: Uuid) -> SessionResult<bool> {
        let updated = self.inner.mark_verified(id).await?;
        self.entries
            .write()
            .await
            .retain(|_, entry| entry.account.id != id);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::models::Role;
    use crate::accounts::store::MockAccountStore;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn account(email: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: String::new(),
            role: Role::User,
            enabled: true,
            locked: false,
            verified: true,
            deleted: false,
        }
    }

    #[tokio::test]
    async fn test_hit_within_ttl_skips_inner_store() {
        let clock = ManualClock::starting_now();
        let alice = account("alice@example.test");
        let mut inner = MockAccountStore::new();
        inner
            .expect_find_by_email()
            .times(2)
            .returning(move |_| Ok(Some(alice.clone())));
        let cache = CachedAccountStore::new(
            Arc::new(inner),
            AccountCacheConfig::default(),
            Arc::new(clock.clone()),
        );

        cache.find_by_email(" Alice@Example.test").await.unwrap();
        cache.find_by_email("alice@example.test").await.unwrap();
        clock.advance(Duration::from_secs(5));
        cache.find_by_email("alice@example.test").await.unwrap();
    }

    #[tokio::test]
    async fn test_misses_are_not_cached() {
        let mut inner = MockAccountStore::new();
        inner.expect_find_by_email().times(2).returning(|_| Ok(None));
        let cache = CachedAccountStore::new(
            Arc::new(inner),
            AccountCacheConfig::default(),
            Arc::new(ManualClock::starting_now()),
        );

        assert!(cache.find_by_email("ghost@example.test").await.unwrap().is_none());
        assert!(cache.find_by_email("ghost@example.test").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let alice = account("alice@example.test");
        let mut inner = MockAccountStore::new();
        inner
            .expect_find_by_email()
            .times(2)
            .returning(move |_| Ok(Some(alice.clone())));
        let cache = CachedAccountStore::new(
            Arc::new(inner),
            AccountCacheConfig::default(),
            Arc::new(ManualClock::starting_now()),
        );

        cache.find_by_email("alice@example.test").await.unwrap();
        cache.invalidate("ALICE@example.test ").await;
        cache.find_by_email("alice@example.test").await.unwrap();
    }

    #[tokio::test]
    async fn test_inner_errors_propagate() {
        let mut inner = MockAccountStore::new();
        inner
            .expect_find_by_email()
            .returning(|_| Err(crate::error::SessionError::Database("down".to_string())));
        let cache = CachedAccountStore::new(
            Arc::new(inner),
            AccountCacheConfig::default(),
            Arc::new(ManualClock::starting_now()),
        );

        assert!(cache.find_by_email("a@example.test").await.is_err());
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let clock = ManualClock::starting_now();
        let mut inner = MockAccountStore::new();
        inner
            .expect_find_by_email()
            .returning(|email| Ok(Some(account(email))));
        let cache = CachedAccountStore::new(
            Arc::new(inner),
            AccountCacheConfig {
                ttl: Duration::from_secs(60),
                capacity: 2,
            },
            Arc::new(clock.clone()),
        );

        cache.find_by_email("a@example.test").await.unwrap();
        clock.advance(Duration::from_secs(1));
        cache.find_by_email("b@example.test").await.unwrap();
        clock.advance(Duration::from_secs(1));
        cache.find_by_email("c@example.test").await.unwrap();

        assert_eq!(cache.len().await, 2);
        assert!(!cache.entries.read().await.contains_key("a@example.test"));
    }

    #[tokio::test]
    async fn test_mark_verified_drops_cached_entry() {
        let alice = account("alice@example.test");
        let id = alice.id;
        let mut inner = MockAccountStore::new();
        inner
            .expect_find_by_email()
            .returning(move |_| Ok(Some(alice.clone())));
        inner.expect_mark_verified().returning(|_| Ok(true));
        let cache = CachedAccountStore::new(
            Arc::new(inner),
            AccountCacheConfig::default(),
            Arc::new(ManualClock::starting_now()),
        );

        cache.find_by_email("alice@example.test").await.unwrap();
        assert!(cache.mark_verified(id).await.unwrap());
        assert!(cache.is_empty().await);
    }
}
