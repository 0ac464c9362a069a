// integrations/notify.rs
// Outbound notification hand-off

use std::sync::Mutex;

use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification gateway unavailable: {0}")]
    Unavailable(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// A delivered (or captured) notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub recipients: Vec<String>,
}

/// Delivery is the gateway's job; the core only hands messages over.
pub trait NotificationSink: Send + Sync {
    fn send(&self, text: &str, recipients: &[String]) -> Result<(), NotifyError>;
}

/// Captures notifications in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    sent: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl NotificationSink for MemorySink {
    fn send(&self, text: &str, recipients: &[String]) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|_| NotifyError::Unavailable("sink lock poisoned".to_string()))?
            .push(Notification {
                text: text.to_string(),
                recipients: recipients.to_vec(),
            });
        Ok(())
    }
}

/// Writes notifications to the log instead of delivering them.
pub struct LogSink {
    prefix: String,
}

impl LogSink {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

impl NotificationSink for LogSink {
    fn send(&self, text: &str, recipients: &[String]) -> Result<(), NotifyError> {
        info!(
            prefix = %self.prefix,
            recipients = recipients.len(),
            "Notification: {}",
            text.lines().next().unwrap_or("")
        );
        Ok(())
    }
}
