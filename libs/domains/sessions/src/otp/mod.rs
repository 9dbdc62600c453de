//! Email one-time passcodes.

mod models;
mod notifier;
mod service;

pub use models::OtpStatus;
pub use notifier::{
    LogNotificationSender, NotificationError, NotificationSender, RecordingNotificationSender,
};
pub use service::OtpEngine;
