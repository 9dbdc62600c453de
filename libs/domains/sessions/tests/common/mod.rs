//! Shared wiring for the integration tests: every backend in memory and a
//! manual clock, so expiry can be driven without sleeping.

#![allow(dead_code)]

use domain_sessions::*;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse battery staple";

pub struct Harness {
    pub service: AuthService,
    pub accounts: InMemoryAccountStore,
    pub sessions: InMemorySessionRepository,
    pub ttl: InMemoryTtlStore,
    pub notifier: RecordingNotificationSender,
    pub clock: ManualClock,
}

pub fn test_config() -> AuthConfig {
    AuthConfig {
        token: TokenConfig {
            access_token_validity: Duration::from_secs(900),
            issuer: Some("https://auth.example.test".to_string()),
            audience: Some("sessions-api".to_string()),
            clock_skew: Duration::from_secs(30),
        },
        ..AuthConfig::default()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let clock = ManualClock::starting_now();
        let shared_clock: SharedClock = Arc::new(clock.clone());
        let accounts = InMemoryAccountStore::new();
        let sessions = InMemorySessionRepository::new();
        let ttl = InMemoryTtlStore::new(shared_clock.clone());
        let notifier = RecordingNotificationSender::new();

        let key = Arc::new(SigningKey::from_bytes(&[42u8; 32]).unwrap());
        let service = AuthService::build(
            config,
            key,
            AuthBackends {
                accounts: Arc::new(accounts.clone()),
                sessions: Arc::new(sessions.clone()),
                ttl_store: Arc::new(ttl.clone()),
                notifier: Arc::new(notifier.clone()),
                clock: shared_clock,
            },
        );

        Self {
            service,
            accounts,
            sessions,
            ttl,
            notifier,
            clock,
        }
    }

    /// A verified, enabled USER account with [`PASSWORD`].
    pub async fn seed_account(&self, email: &str) -> Account {
        self.seed(email, true).await
    }

    pub async fn seed_unverified_account(&self, email: &str) -> Account {
        self.seed(email, false).await
    }

    async fn seed(&self, email: &str, verified: bool) -> Account {
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            password_hash: hash_password(PASSWORD).unwrap(),
            role: Role::User,
            enabled: verified,
            locked: false,
            verified,
            deleted: false,
        };
        self.accounts.upsert(account.clone()).await;
        account
    }

    pub async fn active_session_count(&self, user_id: Uuid) -> usize {
        let now = self.clock.now();
        self.sessions
            .all()
            .await
            .iter()
            .filter(|r| r.user_id == user_id && r.is_active(now))
            .count()
    }
}
