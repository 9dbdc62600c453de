use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// Delivers one-time codes. Retries, if any, are the sender's business.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_otp(&self, email: &str, code: &str) -> Result<(), NotificationError>;
}

/// Logs the delivery without the code. For development.
#[derive(Debug, Default, Clone)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send_otp(&self, email: &str, _code: &str) -> Result<(), NotificationError> {
        info!(%email, "OTP issued (log sender, nothing delivered)");
        Ok(())
    }
}

/// Keeps every sent code in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotificationSender {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send_otp(&self, email: &str, code: &str) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}
