//! Sessions Domain
//!
//! Token and session lifecycle for the auth service: signed access tokens,
//! rotating refresh sessions, revocation, and email one-time passcodes.
//!
//! # Features
//!
//! - HS256 access tokens with clock-skew tolerant verification
//! - Refresh-token rotation with a per-user session cap and sliding expiry
//! - Blacklist and "log out everywhere" fences in a TTL key-value store
//! - Registration of pending accounts, activated by a six-digit OTP code
//!   with resend quota, attempt limit and cooldown
//! - Read-through account cache and an immutable per-request `Principal`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ Handlers/Middleware  │  ← HTTP endpoints, bearer auth
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │     AuthService      │  ← register, login, refresh, logout, OTP
//! └──┬───────┬────────┬──┘
//!    │       │        │
//! ┌──▼───┐┌──▼─────┐┌─▼──────────────┐
//! │Token ││Session ││Revocation / OTP│  ← components
//! │Codec ││Manager ││                │
//! └──────┘└──┬─────┘└─┬──────────────┘
//!            │        │
//! ┌──────────▼──┐┌────▼─────┐┌──────────────┐
//! │SessionRepo  ││ TtlStore ││ AccountStore │  ← storage traits + impls
//! └─────────────┘└──────────┘└──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_sessions::{
//!     AuthBackends, AuthConfig, AuthService, InMemoryAccountStore, InMemorySessionRepository,
//!     InMemoryTtlStore, LogNotificationSender, SigningKey, SystemClock, handlers,
//! };
//!
//! let clock = Arc::new(SystemClock);
//! let key = Arc::new(SigningKey::from_bytes(&[7u8; 32]).unwrap());
//! let service = AuthService::build(
//!     AuthConfig::default(),
//!     key,
//!     AuthBackends {
//!         accounts: Arc::new(InMemoryAccountStore::new()),
//!         sessions: Arc::new(InMemorySessionRepository::new()),
//!         ttl_store: Arc::new(InMemoryTtlStore::new(clock.clone())),
//!         notifier: Arc::new(LogNotificationSender),
//!         clock,
//!     },
//! );
//!
//! let router = handlers::router(service);
//! ```

pub mod accounts;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod otp;
pub mod principal;
pub mod revocation;
pub mod schema;
pub mod service;
pub mod sessions;
pub mod signing_key;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use accounts::{
    Account, AccountStore, AccountSummary, CachedAccountStore, InMemoryAccountStore,
    PostgresAccountStore, Role, hash_password,
};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{
    AccountCacheConfig, AuthConfig, OtpConfig, RevocationConfig, SessionConfig, TokenConfig,
};
pub use error::{SessionError, SessionResult, StoreError, StoreResult};
pub use models::{RegistrationResponse, TokenPair};
pub use otp::{
    LogNotificationSender, NotificationSender, OtpEngine, OtpStatus, RecordingNotificationSender,
};
pub use principal::Principal;
pub use revocation::RevocationStore;
pub use schema::ensure_schema;
pub use service::{AuthBackends, AuthService};
pub use sessions::{
    InMemorySessionRepository, PostgresSessionRepository, SessionManager, SessionRepository,
    spawn_purge_job,
};
pub use signing_key::SigningKey;
pub use store::{InMemoryTtlStore, RedisTtlStore, TtlStore};
pub use token::{AccessClaims, TokenCodec};
