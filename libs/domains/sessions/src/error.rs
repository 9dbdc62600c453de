use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_helpers::ErrorResponse;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Failure of a TTL key-value store call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("TTL store unavailable: {0}")]
    Unavailable(String),

    #[error("TTL store call timed out after {0:?}")]
    Timeout(Duration),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad signature, malformed token, failed claim check, expired, revoked.
    /// The detail is for logs only.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Refresh token is unknown, revoked or expired")]
    InvalidOrExpiredToken,

    #[error("Refresh token presented with a different session id")]
    DeviceMismatch,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account cannot authenticate: {0}")]
    AccountDisabled(String),

    #[error("Email is already registered")]
    AlreadyRegistered,

    #[error("OTP cooldown active for {retry_after_secs}s")]
    Cooldown { retry_after_secs: u64 },

    #[error("OTP requested again within the resend interval ({retry_after_secs}s left)")]
    ResendTooSoon { retry_after_secs: u64 },

    #[error("OTP resend quota exceeded")]
    ResendQuotaExceeded { retry_after_secs: u64 },

    #[error("Incorrect OTP ({attempts_remaining} attempts left)")]
    IncorrectCode { attempts_remaining: u32 },

    #[error("Too many incorrect OTP attempts")]
    TooManyAttempts { retry_after_secs: u64 },

    #[error("OTP expired or not issued")]
    Expired,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<sea_orm::DbErr> for SessionError {
    fn from(e: sea_orm::DbErr) -> Self {
        SessionError::Database(e.to_string())
    }
}

impl From<core_config::ConfigError> for SessionError {
    fn from(e: core_config::ConfigError) -> Self {
        SessionError::Config(e.to_string())
    }
}

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_TOKEN: &str = "Invalid or expired token";
const INVALID_REFRESH: &str = "Invalid or expired refresh token";

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            SessionError::InvalidCredentials | SessionError::AccountDisabled(_) => {
                tracing::info!(reason = %self, "Login rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("INVALID_CREDENTIALS", INVALID_CREDENTIALS),
                )
            }
            SessionError::InvalidToken(detail) => {
                tracing::debug!(%detail, "Access token rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("INVALID_TOKEN", INVALID_TOKEN),
                )
            }
            SessionError::InvalidOrExpiredToken | SessionError::DeviceMismatch => {
                tracing::info!(reason = %self, "Refresh rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("INVALID_REFRESH_TOKEN", INVALID_REFRESH),
                )
            }
            SessionError::AlreadyRegistered => (
                StatusCode::CONFLICT,
                ErrorResponse::new(
                    "EMAIL_ALREADY_REGISTERED",
                    "An account with this email already exists",
                ),
            ),
            SessionError::Cooldown { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::new(
                    "OTP_COOLDOWN",
                    "Too many OTP requests. Please wait before trying again.",
                )
                .with_details(json!({ "retry_after_seconds": retry_after_secs })),
            ),
            SessionError::ResendTooSoon { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::new(
                    "OTP_RESEND_TOO_SOON",
                    "Please wait before requesting another code.",
                )
                .with_details(json!({ "retry_after_seconds": retry_after_secs })),
            ),
            SessionError::ResendQuotaExceeded { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::new(
                    "OTP_QUOTA_EXCEEDED",
                    "Too many OTP requests. Please wait before trying again.",
                )
                .with_details(json!({ "retry_after_seconds": retry_after_secs })),
            ),
            SessionError::IncorrectCode { attempts_remaining } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("OTP_INCORRECT", "Incorrect code.")
                    .with_details(json!({ "attempts_remaining": attempts_remaining })),
            ),
            SessionError::TooManyAttempts { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::new(
                    "OTP_TOO_MANY_ATTEMPTS",
                    "Too many incorrect attempts. Please request a new code later.",
                )
                .with_details(json!({ "retry_after_seconds": retry_after_secs })),
            ),
            SessionError::Expired => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("OTP_EXPIRED", "Code expired or invalid."),
            ),
            SessionError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", msg.clone()),
            ),
            SessionError::Store(e) => {
                tracing::error!(error = %e, "TTL store failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new(
                        "SERVICE_UNAVAILABLE",
                        "Service temporarily unavailable",
                    ),
                )
            }
            SessionError::Database(msg) => {
                tracing::error!(error = %msg, "Session store failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new(
                        "SERVICE_UNAVAILABLE",
                        "Service temporarily unavailable",
                    ),
                )
            }
            SessionError::Config(msg) | SessionError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred"),
                )
            }
        };

        body.into_response_with(status)
    }
}
