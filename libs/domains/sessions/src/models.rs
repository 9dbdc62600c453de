//! Request and response bodies of the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::accounts::AccountSummary;
use crate::otp::OtpStatus;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 1024, message = "Password is required"))]
    pub password: String,
    /// Device or session hint; trimmed and capped at 64 chars.
    #[validate(length(max = 256))]
    pub session_id: Option<String>,
}

#[derive(Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 1024, message = "Password must be at least 8 characters"))]
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Pending account plus the pacing state of the code just sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub user: AccountSummary,
    pub otp: OtpStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, max = 512, message = "Refresh token is required"))]
    pub refresh_token: String,
    #[validate(length(max = 256))]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LogoutRequest {
    #[validate(length(max = 512))]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OtpSendRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OtpVerifyRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(equal = 6, message = "Code must have 6 digits"))]
    pub code: String,
    #[validate(length(max = 256))]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OtpStatusQuery {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Access and refresh credentials handed out by login, refresh and OTP verification.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
    /// Access-token validity in seconds.
    pub expires_in: u64,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
    pub session_id: String,
    pub issued_at: DateTime<Utc>,
    pub user: AccountSummary,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("session_id", &self.session_id)
            .field("issued_at", &self.issued_at)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_validation() {
        let ok = LoginRequest {
            email: "a@example.test".to_string(),
            password: "pw".to_string(),
            session_id: None,
        };
        assert!(ok.validate().is_ok());

        let bad = LoginRequest {
            email: "not-an-email".to_string(),
            password: String::new(),
            session_id: None,
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_otp_code_length() {
        let req = OtpVerifyRequest {
            email: "a@example.test".to_string(),
            code: "12345".to_string(),
            session_id: None,
        };
        assert!(req.validate().is_err());
    }
}
