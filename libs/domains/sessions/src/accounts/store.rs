use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::Account;
use crate::error::{SessionError, SessionResult};

/// Read side of the user directory, plus the writes registration and OTP
/// verification need.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// `email` is already normalized.
    async fn find_by_email(&self, email: &str) -> SessionResult<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> SessionResult<Option<Account>>;

    /// Inserts a new account. `AlreadyRegistered` if the email is taken.
    async fn create(&self, account: Account) -> SessionResult<Account>;

    /// Sets verified and enabled on an account still pending verification.
    /// Leaves `locked` alone. False if no live pending account matched.
    async fn mark_verified(&self, id: Uuid) -> SessionResult<bool>;
}

/// In-memory implementation of AccountStore (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces by id.
    pub async fn upsert(&self, account: Account) {
        self.accounts.write().await.insert(account.id, account);
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> SessionResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> SessionResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn create(&self, account: Account) -> SessionResult<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == account.email) {
            return Err(SessionError::AlreadyRegistered);
        }
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn mark_verified(&self, id: Uuid) -> SessionResult<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&id) {
            Some(account) if !account.deleted && !account.verified => {
                account.verified = true;
                account.enabled = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
