use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One instrument sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Device id (e.g. an ESP board) or the phone number of a manual entry
    pub source_id: String,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, value: f64, source_id: impl Into<String>) -> Self {
        Self {
            timestamp,
            value,
            source_id: source_id.into(),
        }
    }

    /// Manual chat entries are keyed by an international phone number.
    pub fn is_manual_entry(&self) -> bool {
        self.source_id.starts_with('+')
    }
}
