use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Account state as the account store reports it. Never mutated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    /// Normalized (trimmed, lowercase).
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: Role,
    pub enabled: bool,
    pub locked: bool,
    pub verified: bool,
    pub deleted: bool,
}

impl Account {
    pub fn can_authenticate(&self) -> bool {
        self.enabled && !self.locked && !self.deleted && self.verified
    }

    /// First failing flag, for logs.
    pub fn denial_reason(&self) -> Option<&'static str> {
        if self.deleted {
            Some("deleted")
        } else if !self.enabled {
            Some("disabled")
        } else if self.locked {
            Some("locked")
        } else if !self.verified {
            Some("unverified")
        } else {
            None
        }
    }
}

/// What clients see of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            role: account.role,
            email_verified: account.verified,
        }
    }
}

/// Trim + lowercase. Blank input is a validation error.
pub fn normalize_email(raw: &str) -> SessionResult<String> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(SessionError::Validation("Email must be provided".to_string()));
    }
    Ok(email.to_lowercase())
}
