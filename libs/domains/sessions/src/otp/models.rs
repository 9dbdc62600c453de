use serde::{Deserialize, Serialize};

const PREFIX: &str = "otp:signup:";

/// Store keys of one email's challenge. The email must already be normalized.
#[derive(Debug, Clone)]
pub(crate) struct OtpKeys {
    pub code: String,
    pub attempts: String,
    pub resends: String,
    pub resend_lock: String,
    pub cooldown: String,
}

impl OtpKeys {
    pub fn for_email(email: &str) -> Self {
        let key = |suffix: &str| format!("{}{}:{}", PREFIX, email, suffix);
        Self {
            code: key("code"),
            attempts: key("attempts"),
            resends: key("resends"),
            resend_lock: key("resend_lock"),
            cooldown: key("cooldown"),
        }
    }

    /// Keys removed when a code is consumed or burned. The resend counter survives.
    pub fn challenge(&self) -> [String; 3] {
        [
            self.code.clone(),
            self.attempts.clone(),
            self.resend_lock.clone(),
        ]
    }
}

/// Read-only snapshot of an email's OTP limits, for rendering retry guidance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpStatus {
    pub cooldown: bool,
    pub resend_interval_lock: bool,
    /// Sends counted in the current resend window, this one included.
    pub used: u32,
    pub max: u32,
    pub resend_interval_seconds: u64,
    pub cooldown_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let keys = OtpKeys::for_email("a@example.test");
        assert_eq!(keys.code, "otp:signup:a@example.test:code");
        assert_eq!(keys.resend_lock, "otp:signup:a@example.test:resend_lock");
        assert!(!keys.challenge().contains(&keys.resends));
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = OtpStatus {
            cooldown: false,
            resend_interval_lock: true,
            used: 1,
            max: 4,
            resend_interval_seconds: 60,
            cooldown_seconds: 300,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["resendIntervalLock"], true);
        assert_eq!(json["cooldownSeconds"], 300);
    }
}
