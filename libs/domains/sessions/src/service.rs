//! Login, refresh, logout and OTP flows over the lower-level components.

use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::accounts::{
    Account, AccountStore, AccountSummary, CachedAccountStore, Role, hash_password,
    normalize_email, verify_password,
};
use crate::clock::SharedClock;
use crate::config::AuthConfig;
use crate::error::{SessionError, SessionResult};
use crate::models::{RegistrationResponse, TokenPair};
use crate::otp::{NotificationSender, OtpEngine, OtpStatus};
use crate::principal::Principal;
use crate::revocation::RevocationStore;
use crate::sessions::{IssuedRefreshToken, SessionInfo, SessionManager, SessionRepository};
use crate::signing_key::SigningKey;
use crate::store::TtlStore;
use crate::token::TokenCodec;

const TOKEN_TYPE: &str = "Bearer";

/// External collaborators the service is wired to.
pub struct AuthBackends {
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: Arc<dyn SessionRepository>,
    pub ttl_store: Arc<dyn TtlStore>,
    pub notifier: Arc<dyn NotificationSender>,
    pub clock: SharedClock,
}

#[derive(Clone)]
pub struct AuthService {
    codec: TokenCodec,
    sessions: Arc<SessionManager>,
    revocation: RevocationStore,
    otp: OtpEngine,
    accounts: Arc<CachedAccountStore>,
    clock: SharedClock,
}

impl AuthService {
    pub fn build(config: AuthConfig, key: Arc<SigningKey>, backends: AuthBackends) -> Self {
        let AuthBackends {
            accounts,
            sessions,
            ttl_store,
            notifier,
            clock,
        } = backends;

        let codec = TokenCodec::new(key, config.token, clock.clone());
        let revocation = RevocationStore::new(
            ttl_store.clone(),
            codec.clone(),
            config.revocation,
            clock.clone(),
        );

        Self {
            sessions: Arc::new(SessionManager::new(sessions, config.sessions, clock.clone())),
            otp: OtpEngine::new(ttl_store, notifier, config.otp),
            accounts: Arc::new(CachedAccountStore::new(
                accounts,
                config.account_cache,
                clock.clone(),
            )),
            codec,
            revocation,
            clock,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        self.sessions.clone()
    }

    pub fn revocation(&self) -> &RevocationStore {
        &self.revocation
    }

    pub fn accounts(&self) -> Arc<CachedAccountStore> {
        self.accounts.clone()
    }

    /// Creates a pending account (unverified, disabled) and sends its first code.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> SessionResult<RegistrationResponse> {
        let email = normalize_email(email)?;
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(SessionError::AlreadyRegistered);
        }

        let account = self
            .accounts
            .create(Account {
                id: Uuid::new_v4(),
                email,
                password_hash: hash_password(password)?,
                role: Role::User,
                enabled: false,
                locked: false,
                verified: false,
                deleted: false,
            })
            .await?;
        info!(account_id = %account.id, "Account registered, pending verification");

        let otp = self.otp.generate_and_send(&account.email).await?;
        Ok(RegistrationResponse {
            user: AccountSummary::from(&account),
            otp,
        })
    }

    /// Password login. Unknown email, wrong password and unusable account all
    /// render as the same 401.
    #[instrument(skip(self, password, session_hint))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        session_hint: Option<&str>,
    ) -> SessionResult<TokenPair> {
        let email = normalize_email(email).map_err(|_| SessionError::InvalidCredentials)?;

        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(SessionError::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash) {
            return Err(SessionError::InvalidCredentials);
        }
        if let Some(reason) = account.denial_reason() {
            return Err(SessionError::AccountDisabled(reason.to_string()));
        }

        let pair = self.issue_tokens(&account, session_hint).await?;
        info!(account_id = %account.id, session_id = %pair.session_id, "Login succeeded");
        Ok(pair)
    }

    /// Rotates the refresh token and mints a new access token.
    ///
    /// If the account can no longer authenticate, every session it has is revoked.
    #[instrument(skip_all)]
    pub async fn refresh(
        &self,
        raw_refresh: &str,
        session_id: Option<&str>,
    ) -> SessionResult<TokenPair> {
        let rotated = self
            .sessions
            .validate_and_rotate(raw_refresh, session_id)
            .await?;

        let account = self.accounts.find_by_id(rotated.user_id).await?;
        let account = match account {
            Some(account) if account.can_authenticate() => account,
            other => {
                warn!(
                    account_id = %rotated.user_id,
                    reason = other.as_ref().and_then(Account::denial_reason).unwrap_or("missing"),
                    "Refresh for an account that cannot authenticate"
                );
                self.sessions.revoke_all_for_user(rotated.user_id).await?;
                return Err(SessionError::InvalidOrExpiredToken);
            }
        };

        self.token_pair(&account, rotated)
    }

    /// Blacklists the presented access token and revokes the refresh session, if given.
    #[instrument(skip_all, fields(account_id = %principal.account_id))]
    pub async fn logout(
        &self,
        principal: &Principal,
        raw_access: &str,
        raw_refresh: Option<&str>,
    ) -> SessionResult<()> {
        self.revocation.blacklist(raw_access).await;

        if let Some(raw) = raw_refresh.filter(|r| !r.trim().is_empty())
            && !self.sessions.revoke_token(raw).await?
        {
            info!("Logout with a refresh token that was not active");
        }
        Ok(())
    }

    /// Revokes every access token issued so far to the caller and every session.
    #[instrument(skip_all, fields(account_id = %principal.account_id))]
    pub async fn logout_all(&self, principal: &Principal) -> SessionResult<u64> {
        let config = self.codec.config();
        let fence_ttl = config.access_token_validity + config.clock_skew;

        self.revocation
            .set_revocation_fence(
                config.issuer.as_deref(),
                &principal.subject,
                self.clock.now().timestamp(),
                fence_ttl,
            )
            .await;

        let revoked = self
            .sessions
            .revoke_all_for_user(principal.account_id)
            .await?;
        info!(revoked, "Logged out everywhere");
        Ok(revoked)
    }

    /// Turns a bearer token into a [`Principal`].
    ///
    /// Rejections all come back as `InvalidToken`; account-store outages propagate.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, bearer: &str) -> SessionResult<Principal> {
        let claims = self.codec.parse_and_verify(bearer)?;

        if self.revocation.is_claims_blacklisted(&claims, bearer).await {
            return Err(SessionError::InvalidToken("token revoked".to_string()));
        }
        if self
            .revocation
            .is_before_fence(claims.iss.as_deref(), &claims.sub, claims.iat)
            .await
        {
            return Err(SessionError::InvalidToken(
                "token issued before revocation fence".to_string(),
            ));
        }

        let account = self
            .accounts
            .find_by_email(&claims.sub)
            .await?
            .ok_or_else(|| SessionError::InvalidToken("subject has no account".to_string()))?;

        if let Some(reason) = account.denial_reason() {
            return Err(SessionError::InvalidToken(format!("account {}", reason)));
        }
        if let Some(uid) = claims.extra.get("uid").and_then(Value::as_str)
            && uid != account.id.to_string()
        {
            return Err(SessionError::InvalidToken(
                "token names another account".to_string(),
            ));
        }

        Ok(Principal::new(&account, &claims))
    }

    pub async fn active_sessions(&self, principal: &Principal) -> SessionResult<Vec<SessionInfo>> {
        self.sessions.active_sessions(principal.account_id).await
    }

    /// Sends a code only to an account still pending verification. Any other
    /// email gets the current pacing state back and no mail.
    #[instrument(skip(self))]
    pub async fn send_otp(&self, email: &str) -> SessionResult<OtpStatus> {
        let email = normalize_email(email)?;
        match self.accounts.find_by_email(&email).await? {
            Some(account) if !account.verified && !account.deleted => {
                self.otp.generate_and_send(&email).await
            }
            _ => {
                info!("OTP requested for an email with no pending account");
                self.otp.status(&email).await
            }
        }
    }

    pub async fn otp_status(&self, email: &str) -> SessionResult<OtpStatus> {
        self.otp.status(email).await
    }

    /// Consumes the code, marks a pending account verified and logs it in.
    ///
    /// An account that is already verified keeps its flags; a lock set by an
    /// administrator still denies the login.
    #[instrument(skip(self, code, session_hint))]
    pub async fn verify_otp(
        &self,
        email: &str,
        code: &str,
        session_hint: Option<&str>,
    ) -> SessionResult<TokenPair> {
        self.otp.verify_and_consume(email, code).await?;

        let email = normalize_email(email)?;
        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(SessionError::InvalidCredentials)?;

        if !account.verified && !self.accounts.mark_verified(account.id).await? {
            debug!(account_id = %account.id, "Account left the pending state during verification");
        }
        let account = self
            .accounts
            .find_by_id(account.id)
            .await?
            .ok_or(SessionError::InvalidCredentials)?;
        if let Some(reason) = account.denial_reason() {
            return Err(SessionError::AccountDisabled(reason.to_string()));
        }

        info!(account_id = %account.id, "OTP verified");
        self.issue_tokens(&account, session_hint).await
    }

    async fn issue_tokens(
        &self,
        account: &Account,
        session_hint: Option<&str>,
    ) -> SessionResult<TokenPair> {
        let refresh = self.sessions.issue(account.id, session_hint).await?;
        self.token_pair(account, refresh)
    }

    fn token_pair(&self, account: &Account, refresh: IssuedRefreshToken) -> SessionResult<TokenPair> {
        let mut extra = Map::new();
        extra.insert("uid".to_string(), json!(account.id.to_string()));
        extra.insert("role".to_string(), json!(account.role));

        let access = self.codec.issue(&account.email, extra)?;

        Ok(TokenPair {
            access_token: access.token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: self.codec.config().access_token_validity.as_secs(),
            refresh_token: refresh.raw_token,
            refresh_expires_at: refresh.expires_at,
            session_id: refresh.session_id,
            issued_at: access.claims.issued_at(),
            user: AccountSummary::from(account),
        })
    }
}
