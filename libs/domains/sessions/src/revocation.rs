//! Access-token blacklist and per-subject revocation fences.
//!
//! Store failures are logged and treated as "not revoked": the codec's
//! signature and expiry checks stay the primary defense, and a TTL-store
//! outage must not lock every caller out.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::clock::SharedClock;
use crate::config::RevocationConfig;
use crate::crypto::sha256_url;
use crate::store::TtlStore;
use crate::token::{AccessClaims, TokenCodec};

const KEY_PREFIX: &str = "jwt:bl:";
const SENTINEL: &str = "1";

fn issuer_prefix(issuer: Option<&str>) -> String {
    match issuer.filter(|iss| !iss.trim().is_empty()) {
        Some(iss) => format!("{}iss:{}:", KEY_PREFIX, sha256_url(iss)),
        None => KEY_PREFIX.to_string(),
    }
}

/// Blacklist key: jti when present, otherwise a hash of the raw token.
pub fn blacklist_key(issuer: Option<&str>, jti: Option<&str>, raw_token: &str) -> String {
    match jti.filter(|j| !j.trim().is_empty()) {
        Some(jti) => format!("{}jti:{}", issuer_prefix(issuer), jti),
        None => format!("{}sha:{}", issuer_prefix(issuer), sha256_url(raw_token)),
    }
}

pub fn fence_key(issuer: Option<&str>, subject: &str) -> String {
    format!(
        "{}sub:{}:revoked-after",
        issuer_prefix(issuer),
        sha256_url(subject)
    )
}

pub struct RevocationStore<S: TtlStore + ?Sized = dyn TtlStore> {
    store: Arc<S>,
    codec: TokenCodec,
    config: RevocationConfig,
    clock: SharedClock,
}

impl<S: TtlStore + ?Sized> Clone for RevocationStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            codec: self.codec.clone(),
            config: self.config.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S: TtlStore + ?Sized> RevocationStore<S> {
    pub fn new(
        store: Arc<S>,
        codec: TokenCodec,
        config: RevocationConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            codec,
            config,
            clock,
        }
    }

    /// Blacklists `token` for as long as the codec would still accept it.
    ///
    /// Tokens that fail signature checks, or are past `exp` plus the codec's
    /// clock skew, are skipped.
    #[instrument(skip_all)]
    pub async fn blacklist(&self, token: &str) {
        if token.trim().is_empty() {
            return;
        }
        match self.codec.inspect(token) {
            Ok(claims) => self.write_blacklist_entry(&claims, token).await,
            Err(e) => debug!(error = %e, "Blacklist skipped: token did not parse"),
        }
    }

    /// Blacklists a token this service already verified.
    #[instrument(skip_all, fields(jti = ?claims.jti))]
    pub async fn blacklist_claims(&self, claims: &AccessClaims, raw_token: &str) {
        self.write_blacklist_entry(claims, raw_token).await
    }

    async fn write_blacklist_entry(&self, claims: &AccessClaims, raw_token: &str) {
        let Some(ttl) = self.entry_ttl(claims.exp) else {
            debug!("Blacklist skipped: token no longer accepted");
            return;
        };
        let key = blacklist_key(claims.iss.as_deref(), claims.jti.as_deref(), raw_token);

        match self.store.set(&key, SENTINEL, ttl).await {
            Ok(()) => debug!(ttl_ms = ttl.as_millis() as u64, "Token blacklisted"),
            Err(e) => warn!(error = %e, "TTL store unavailable while blacklisting token"),
        }
    }

    /// Time left until the codec rejects a token expiring at `exp` (which
    /// accepts it up to `exp + clock_skew`), plus `skew_margin`, floored at
    /// `min_ttl`. `None` once that window has closed.
    fn entry_ttl(&self, exp: i64) -> Option<Duration> {
        let now_ms = self.clock.now().timestamp_millis();
        let leeway_ms = self.codec.config().clock_skew.as_millis() as i64;
        let accepted_ms = exp.saturating_mul(1000).saturating_add(leeway_ms) - now_ms;
        if accepted_ms <= 0 {
            return None;
        }
        let margin_ms = self.config.skew_margin.as_millis() as i64;
        let ttl_ms = (accepted_ms + margin_ms).max(self.config.min_ttl.as_millis() as i64);
        Some(Duration::from_millis(ttl_ms.max(1) as u64))
    }

    /// Looks up by jti, falling back to the raw-token hash. False on any error.
    #[instrument(skip_all)]
    pub async fn is_blacklisted(&self, token: &str) -> bool {
        if token.trim().is_empty() {
            return false;
        }
        match self.codec.inspect(token) {
            Ok(claims) => self.is_claims_blacklisted(&claims, token).await,
            Err(e) => {
                debug!(error = %e, "Blacklist check: token did not parse");
                false
            }
        }
    }

    pub async fn is_claims_blacklisted(&self, claims: &AccessClaims, raw_token: &str) -> bool {
        let key = blacklist_key(claims.iss.as_deref(), claims.jti.as_deref(), raw_token);
        match self.store.exists(&key).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "TTL store unavailable during blacklist check");
                false
            }
        }
    }

    /// Treats every token for `subject` issued at or before `revoked_after`
    /// (epoch seconds) as revoked, for `ttl`.
    #[instrument(skip(self, subject))]
    pub async fn set_revocation_fence(
        &self,
        issuer: Option<&str>,
        subject: &str,
        revoked_after: i64,
        ttl: Duration,
    ) {
        let key = fence_key(issuer, subject);
        let ttl = ttl.max(Duration::from_secs(1));
        if let Err(e) = self
            .store
            .set(&key, &revoked_after.to_string(), ttl)
            .await
        {
            warn!(error = %e, "TTL store unavailable while setting revocation fence");
        }
    }

    /// `issued_at <= fence`. False when no fence exists or the store fails.
    pub async fn is_before_fence(&self, issuer: Option<&str>, subject: &str, issued_at: i64) -> bool {
        let key = fence_key(issuer, subject);
        match self.store.get(&key).await {
            Ok(Some(value)) => match value.parse::<i64>() {
                Ok(fence) => issued_at <= fence,
                Err(_) => {
                    warn!("Unreadable revocation fence value");
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "TTL store unavailable while reading revocation fence");
                false
            }
        }
    }
}
