/// User-facing error taxonomy for the diagnosis core.
/// Each code tells the caller how to render a failure, not why it happened.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Rule/matrix source unreadable; the whole diagnosis request fails
    ConfigUnavailable,
    /// One table/column/value absent; the affected rule evaluates to FAIL
    PartialDataMissing,
    /// Not enough samples for trend or validation analysis
    InsufficientSamples,
    /// Notification or explanation service failed after the core succeeded
    ExternalServiceFailure,
    /// Outcome reported against an unknown prediction record
    ValidationNotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::ConfigUnavailable => "config_unavailable",
            ErrorCode::PartialDataMissing => "partial_data_missing",
            ErrorCode::InsufficientSamples => "insufficient_samples",
            ErrorCode::ExternalServiceFailure => "external_service_failure",
            ErrorCode::ValidationNotFound => "validation_not_found",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>, // rule param, table name or record id
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_report_serializes_snake_case() {
        let report = ErrorReport::new(ErrorCode::ValidationNotFound, "no such record")
            .with_subject("abc");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"validation_not_found\""));
        assert!(json.contains("\"abc\""));
    }
}
