//! Runtime settings for every component, loaded through [`FromEnv`].

use core_config::{
    ConfigError, FromEnv, env_duration_millis, env_duration_secs, env_optional, env_parse,
};
use std::time::Duration;

pub const MIN_REFRESH_TOKEN_BYTES: usize = 32;

/// Access-token minting and verification.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_token_validity: Duration,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Tolerance applied to `exp` and `nbf`.
    pub clock_skew: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_validity: Duration::from_secs(900),
            issuer: None,
            audience: None,
            clock_skew: Duration::from_secs(30),
        }
    }
}

impl FromEnv for TokenConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let validity = env_duration_secs("JWT_ACCESS_TOKEN_VALIDITY_SECS", 900)?;
        if validity.is_zero() {
            return Err(ConfigError::parse(
                "JWT_ACCESS_TOKEN_VALIDITY_SECS",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            access_token_validity: validity,
            issuer: env_optional("JWT_ISSUER"),
            audience: env_optional("JWT_AUDIENCE"),
            clock_skew: env_duration_secs("JWT_CLOCK_SKEW_SECS", 30)?,
        })
    }
}

/// Refresh-token sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sliding window; every rotation starts a new one.
    pub inactivity_window: Duration,
    pub absolute_lifetime: Duration,
    pub max_sessions: usize,
    /// Random bytes per refresh token before encoding.
    pub token_bytes: usize,
    pub purge_interval: Duration,
}

impl SessionConfig {
    /// Applies the floors: at least one session, at least 32 random bytes.
    pub fn normalized(mut self) -> Self {
        self.max_sessions = self.max_sessions.max(1);
        self.token_bytes = self.token_bytes.max(MIN_REFRESH_TOKEN_BYTES);
        self
    }

    /// `min(inactivity window, absolute lifetime)`.
    pub fn session_lifetime(&self) -> Duration {
        self.inactivity_window.min(self.absolute_lifetime)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_window: Duration::from_secs(604_800),
            absolute_lifetime: Duration::from_secs(2_592_000),
            max_sessions: 3,
            token_bytes: 64,
            purge_interval: Duration::from_secs(3600),
        }
    }
}

impl FromEnv for SessionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            inactivity_window: env_duration_secs("REFRESH_INACTIVITY_SECS", 604_800)?,
            absolute_lifetime: env_duration_secs("REFRESH_ABSOLUTE_LIFETIME_SECS", 2_592_000)?,
            max_sessions: env_parse("REFRESH_MAX_SESSIONS", defaults.max_sessions)?,
            token_bytes: env_parse("REFRESH_TOKEN_BYTES", defaults.token_bytes)?,
            purge_interval: env_duration_secs("REFRESH_PURGE_INTERVAL_SECS", 3600)?,
        }
        .normalized())
    }
}

/// One-time passcodes.
#[derive(Debug, Clone)]
pub struct OtpConfig {
    pub code_ttl: Duration,
    pub max_resends: u32,
    pub resend_interval: Duration,
    /// Window of the resend counter, started by the first send.
    pub resend_window: Duration,
    pub cooldown: Duration,
    pub max_verify_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_ttl: Duration::from_secs(300),
            max_resends: 4,
            resend_interval: Duration::from_secs(60),
            resend_window: Duration::from_secs(1800),
            cooldown: Duration::from_secs(300),
            max_verify_attempts: 5,
        }
    }
}

impl FromEnv for OtpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            code_ttl: env_duration_secs("OTP_TTL_SECS", 300)?,
            max_resends: env_parse("OTP_MAX_RESENDS", defaults.max_resends)?,
            resend_interval: env_duration_secs("OTP_RESEND_INTERVAL_SECS", 60)?,
            resend_window: env_duration_secs("OTP_RESEND_WINDOW_SECS", 1800)?,
            cooldown: env_duration_secs("OTP_COOLDOWN_SECS", 300)?,
            max_verify_attempts: env_parse(
                "OTP_MAX_VERIFY_ATTEMPTS",
                defaults.max_verify_attempts,
            )?
            .max(1),
        })
    }
}

/// Blacklist entry lifetimes.
#[derive(Debug, Clone)]
pub struct RevocationConfig {
    /// How long a blacklist entry outlives the codec's acceptance window.
    pub skew_margin: Duration,
    /// Smallest TTL written for a token that is still live.
    pub min_ttl: Duration,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            skew_margin: Duration::from_millis(5000),
            min_ttl: Duration::from_millis(100),
        }
    }
}

impl FromEnv for RevocationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            skew_margin: env_duration_millis("REVOCATION_SKEW_MARGIN_MS", 5000)?,
            min_ttl: env_duration_millis("REVOCATION_MIN_TTL_MS", 100)?,
        })
    }
}

/// Read-through cache in front of the account store.
#[derive(Debug, Clone)]
pub struct AccountCacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl Default for AccountCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5),
            capacity: 10_000,
        }
    }
}

impl FromEnv for AccountCacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            ttl: env_duration_secs("ACCOUNT_CACHE_TTL_SECS", 5)?,
            capacity: env_parse("ACCOUNT_CACHE_CAPACITY", 10_000usize)?.max(1),
        })
    }
}

/// Everything the auth service needs, minus the signing key.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token: TokenConfig,
    pub sessions: SessionConfig,
    pub otp: OtpConfig,
    pub revocation: RevocationConfig,
    pub account_cache: AccountCacheConfig,
    /// Upper bound on every TTL-store call.
    pub store_op_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: TokenConfig::default(),
            sessions: SessionConfig::default(),
            otp: OtpConfig::default(),
            revocation: RevocationConfig::default(),
            account_cache: AccountCacheConfig::default(),
            store_op_timeout: Duration::from_millis(500),
        }
    }
}

impl FromEnv for AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            token: TokenConfig::from_env()?,
            sessions: SessionConfig::from_env()?,
            otp: OtpConfig::from_env()?,
            revocation: RevocationConfig::from_env()?,
            account_cache: AccountCacheConfig::from_env()?,
            store_op_timeout: env_duration_millis("STORE_OP_TIMEOUT_MS", 500)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_floors() {
        let config = SessionConfig {
            max_sessions: 0,
            token_bytes: 8,
            ..SessionConfig::default()
        }
        .normalized();

        assert_eq!(config.max_sessions, 1);
        assert_eq!(config.token_bytes, MIN_REFRESH_TOKEN_BYTES);
    }

    #[test]
    fn test_session_lifetime_is_the_smaller_bound() {
        let config = SessionConfig {
            inactivity_window: Duration::from_secs(1),
            absolute_lifetime: Duration::from_secs(3600),
            ..SessionConfig::default()
        };
        assert_eq!(config.session_lifetime(), Duration::from_secs(1));
    }

    #[test]
    fn test_auth_config_defaults_from_empty_env() {
        temp_env::with_vars_unset(
            [
                "JWT_ACCESS_TOKEN_VALIDITY_SECS",
                "JWT_ISSUER",
                "REFRESH_MAX_SESSIONS",
                "OTP_MAX_RESENDS",
                "STORE_OP_TIMEOUT_MS",
            ],
            || {
                let config = AuthConfig::from_env().unwrap();
                assert_eq!(config.token.access_token_validity, Duration::from_secs(900));
                assert_eq!(config.token.issuer, None);
                assert_eq!(config.sessions.max_sessions, 3);
                assert_eq!(config.otp.max_resends, 4);
                assert_eq!(config.store_op_timeout, Duration::from_millis(500));
            },
        );
    }

    #[test]
    fn test_auth_config_overrides() {
        temp_env::with_vars(
            [
                ("JWT_ISSUER", Some("https://auth.example.test")),
                ("REFRESH_MAX_SESSIONS", Some("0")),
                ("REFRESH_INACTIVITY_SECS", Some("120")),
                ("OTP_COOLDOWN_SECS", Some("60")),
            ],
            || {
                let config = AuthConfig::from_env().unwrap();
                assert_eq!(
                    config.token.issuer.as_deref(),
                    Some("https://auth.example.test")
                );
                assert_eq!(config.sessions.max_sessions, 1);
                assert_eq!(config.sessions.inactivity_window, Duration::from_secs(120));
                assert_eq!(config.otp.cooldown, Duration::from_secs(60));
            },
        );
    }

    #[test]
    fn test_zero_access_validity_rejected() {
        temp_env::with_var("JWT_ACCESS_TOKEN_VALIDITY_SECS", Some("0"), || {
            let err = TokenConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("JWT_ACCESS_TOKEN_VALIDITY_SECS"));
        });
    }

    #[test]
    fn test_malformed_value_names_the_key() {
        temp_env::with_var("OTP_MAX_VERIFY_ATTEMPTS", Some("five"), || {
            let err = OtpConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("OTP_MAX_VERIFY_ATTEMPTS"));
        });
    }
}
