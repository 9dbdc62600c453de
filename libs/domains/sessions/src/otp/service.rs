use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::models::{OtpKeys, OtpStatus};
use super::notifier::NotificationSender;
use crate::accounts::normalize_email;
use crate::config::OtpConfig;
use crate::crypto::{constant_time_eq, sha256_hex};
use crate::error::{SessionError, SessionResult};
use crate::store::TtlStore;

const FLAG: &str = "1";

/// Six-digit email codes with resend quota, resend lock, attempt limit and cooldown.
///
/// All counters live in the TTL store so every instance shares them.
pub struct OtpEngine<S = dyn TtlStore, N = dyn NotificationSender>
where
    S: TtlStore + ?Sized,
    N: NotificationSender + ?Sized,
{
    store: Arc<S>,
    notifier: Arc<N>,
    config: OtpConfig,
}

impl<S, N> Clone for OtpEngine<S, N>
where
    S: TtlStore + ?Sized,
    N: NotificationSender + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            config: self.config.clone(),
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_millis().div_ceil(1000) as u64
}

impl<S, N> OtpEngine<S, N>
where
    S: TtlStore + ?Sized,
    N: NotificationSender + ?Sized,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: OtpConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Issues a fresh code for `email` and hands it to the notifier.
    ///
    /// The resend counter is not reset by a later successful verification.
    #[instrument(skip(self))]
    pub async fn generate_and_send(&self, email: &str) -> SessionResult<OtpStatus> {
        let email = normalize_email(email)?;
        let keys = OtpKeys::for_email(&email);

        if self.store.exists(&keys.cooldown).await? {
            return Err(SessionError::Cooldown {
                retry_after_secs: self.retry_after(&keys.cooldown, self.config.cooldown).await,
            });
        }
        if self.store.exists(&keys.resend_lock).await? {
            return Err(SessionError::ResendTooSoon {
                retry_after_secs: self
                    .retry_after(&keys.resend_lock, self.config.resend_interval)
                    .await,
            });
        }

        let used = self
            .store
            .increment(&keys.resends, self.config.resend_window)
            .await?;
        if used > i64::from(self.config.max_resends) {
            self.store
                .set(&keys.cooldown, FLAG, self.config.cooldown)
                .await?;
            warn!(used, "OTP resend quota exceeded, cooldown started");
            return Err(SessionError::ResendQuotaExceeded {
                retry_after_secs: ceil_secs(self.config.cooldown),
            });
        }

        let code = rand::rng().random_range(100_000..=999_999u32).to_string();
        self.store
            .set(&keys.code, &sha256_hex(&code), self.config.code_ttl)
            .await?;
        self.store
            .set(&keys.attempts, "0", self.config.code_ttl)
            .await?;
        self.store
            .set(&keys.resend_lock, FLAG, self.config.resend_interval)
            .await?;

        if let Err(e) = self.notifier.send_otp(&email, &code).await {
            warn!(error = %e, "OTP notification failed");
        }

        info!(used, "OTP issued");
        Ok(OtpStatus {
            cooldown: false,
            resend_interval_lock: true,
            used: used as u32,
            max: self.config.max_resends,
            resend_interval_seconds: self.config.resend_interval.as_secs(),
            cooldown_seconds: self.config.cooldown.as_secs(),
        })
    }

    /// Checks `candidate` against the stored hash and consumes the code on success.
    #[instrument(skip(self, candidate))]
    pub async fn verify_and_consume(&self, email: &str, candidate: &str) -> SessionResult<()> {
        let email = normalize_email(email)?;
        let keys = OtpKeys::for_email(&email);

        let Some(stored) = self.store.get(&keys.code).await? else {
            return Err(SessionError::Expired);
        };

        if constant_time_eq(&sha256_hex(candidate.trim()), &stored) {
            self.store.delete(&keys.challenge()).await?;
            info!("OTP verified");
            return Ok(());
        }

        let attempts = self
            .store
            .increment(&keys.attempts, self.config.code_ttl)
            .await?;
        let max = i64::from(self.config.max_verify_attempts);
        if attempts >= max {
            self.store.delete(&keys.challenge()).await?;
            self.store
                .set(&keys.cooldown, FLAG, self.config.cooldown)
                .await?;
            warn!(attempts, "Too many incorrect OTP attempts, code burned");
            return Err(SessionError::TooManyAttempts {
                retry_after_secs: ceil_secs(self.config.cooldown),
            });
        }

        Err(SessionError::IncorrectCode {
            attempts_remaining: (max - attempts) as u32,
        })
    }

    /// Never writes.
    pub async fn status(&self, email: &str) -> SessionResult<OtpStatus> {
        let email = normalize_email(email)?;
        let keys = OtpKeys::for_email(&email);

        let cooldown = self.store.exists(&keys.cooldown).await?;
        let resend_interval_lock = self.store.exists(&keys.resend_lock).await?;
        let used = self
            .store
            .get(&keys.resends)
            .await?
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);

        Ok(OtpStatus {
            cooldown,
            resend_interval_lock,
            used,
            max: self.config.max_resends,
            resend_interval_seconds: self.config.resend_interval.as_secs(),
            cooldown_seconds: self.config.cooldown.as_secs(),
        })
    }

    async fn retry_after(&self, key: &str, fallback: Duration) -> u64 {
        match self.store.remaining_ttl(key).await {
            Ok(Some(ttl)) => ceil_secs(ttl),
            _ => ceil_secs(fallback),
        }
    }
}
