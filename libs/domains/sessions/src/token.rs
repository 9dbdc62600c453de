//! Access-token codec (HS256 JWT).
//!
//! Signature, issuer and audience are checked by `jsonwebtoken`; the time
//! bounds are checked here against the injected [`Clock`] so tests control
//! "now". Expired and malformed tokens fail the same way.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::SharedClock;
use crate::config::TokenConfig;
use crate::error::{SessionError, SessionResult};
use crate::signing_key::SigningKey;

/// Claim names callers can never set through extra claims.
pub const RESERVED_CLAIMS: [&str; 7] = ["sub", "iat", "nbf", "exp", "jti", "iss", "aud"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccessClaims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

/// A freshly signed token and the claims inside it.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub claims: AccessClaims,
}

#[derive(Clone)]
pub struct TokenCodec {
    key: Arc<SigningKey>,
    config: TokenConfig,
    clock: SharedClock,
    header: Header,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(key: Arc<SigningKey>, config: TokenConfig, clock: SharedClock) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            key,
            config,
            clock,
            header: Header::new(Algorithm::HS256),
            validation,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Signs a token for `subject`.
    ///
    /// Reserved claims in `extra` are dropped; the standard claims always win.
    pub fn issue(&self, subject: &str, extra: Map<String, Value>) -> SessionResult<IssuedAccessToken> {
        if subject.trim().is_empty() {
            return Err(SessionError::Validation("subject must not be blank".to_string()));
        }

        let now = self.clock.now().timestamp();
        let validity = self.config.access_token_validity.as_secs().max(1) as i64;

        let mut extra = extra;
        for name in RESERVED_CLAIMS {
            extra.remove(name);
        }

        let claims = AccessClaims {
            sub: subject.to_string(),
            iat: now,
            nbf: now,
            exp: now + validity,
            jti: Some(Uuid::new_v4().simple().to_string()),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            extra,
        };

        let token = encode(&self.header, &claims, self.key.encoding_key())
            .map_err(|e| SessionError::Internal(format!("failed to sign access token: {}", e)))?;

        Ok(IssuedAccessToken { token, claims })
    }

    /// Verifies signature, issuer, audience and the skew-tolerant time bounds.
    pub fn parse_and_verify(&self, token: &str) -> SessionResult<AccessClaims> {
        let claims = self.inspect(token)?;
        let now = self.clock.now().timestamp();
        let leeway = self.config.clock_skew.as_secs() as i64;

        if claims.exp <= claims.iat {
            return Err(SessionError::InvalidToken("exp is not after iat".to_string()));
        }
        if claims.exp + leeway <= now {
            return Err(SessionError::InvalidToken("token expired".to_string()));
        }
        if claims.nbf - leeway > now {
            return Err(SessionError::InvalidToken("token not yet valid".to_string()));
        }

        Ok(claims)
    }

    /// Signature-checked claims with no time checks. For revocation bookkeeping.
    pub fn inspect(&self, token: &str) -> SessionResult<AccessClaims> {
        decode::<AccessClaims>(token, self.key.decoding_key(), &self.validation)
            .map(|data| data.claims)
            .map_err(|e| SessionError::InvalidToken(e.to_string()))
    }

    /// True once `exp` has passed. Tokens that fail signature checks count as expired.
    pub fn is_expired(&self, token: &str) -> bool {
        match self.inspect(token) {
            Ok(claims) => claims.exp <= self.clock.now().timestamp(),
            Err(_) => true,
        }
    }

    /// Valid, unexpired, and issued to exactly `expected_subject`.
    pub fn validate_for_subject(&self, token: &str, expected_subject: &str) -> bool {
        match self.parse_and_verify(token) {
            Ok(claims) => {
                claims.sub == expected_subject && claims.exp > self.clock.now().timestamp()
            }
            Err(_) => false,
        }
    }
}
