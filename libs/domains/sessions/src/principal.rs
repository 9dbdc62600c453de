use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::accounts::{Account, Role};
use crate::token::AccessClaims;

/// The authenticated caller of one request.
///
/// Built once from a verified access token and the account it names, then
/// passed to whatever needs it. Holds no handle back to any store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub account_id: Uuid,
    pub subject: String,
    pub role: Role,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    pub(crate) fn new(account: &Account, claims: &AccessClaims) -> Self {
        Self {
            account_id: account.id,
            subject: claims.sub.clone(),
            role: account.role,
            verified: account.verified,
            token_id: claims.jti.clone(),
            issued_at: claims.issued_at(),
            expires_at: claims.expires_at(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
