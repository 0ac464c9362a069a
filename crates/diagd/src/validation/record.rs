// validation/record.rs
// Prediction records and canonical label sets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A logged prediction and, once reported, its real outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// DO, pH, FEED, AERATION or any caller-defined type
    pub category_type: String,
    /// Inputs the prediction was made from
    pub input_snapshot: serde_json::Value,
    pub predicted_label: String,
    /// 0..=1, 3 decimals
    pub confidence: f64,
    pub actual_label: Option<String>,
    pub validated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
}

impl PredictionRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        category_type: &str,
        input_snapshot: serde_json::Value,
        predicted_label: &str,
        confidence: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            category_type: category_type.trim().to_string(),
            input_snapshot,
            predicted_label: normalize_label(predicted_label),
            confidence: (confidence.clamp(0.0, 1.0) * 1000.0).round() / 1000.0,
            actual_label: None,
            validated: false,
            is_correct: None,
            validated_at: None,
            notes: String::new(),
        }
    }

    /// Set the outcome and derive correctness. Overwrites any earlier outcome;
    /// callers decide whether that is allowed.
    pub fn apply_outcome(&mut self, actual_label: &str, at: DateTime<Utc>) {
        let actual = normalize_label(actual_label);
        self.is_correct = Some(actual == self.predicted_label);
        self.actual_label = Some(actual);
        self.validated = true;
        self.validated_at = Some(at);
    }

    pub fn is_type(&self, category_type: &str) -> bool {
        self.category_type.eq_ignore_ascii_case(category_type.trim())
    }
}

/// Labels are compared trimmed and uppercased.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_uppercase()
}

const DO_LABELS: &[&str] = &["NORMAL", "LOW", "CRITICAL"];
const PH_LABELS: &[&str] = &["NORMAL", "DRIFT_UP", "DRIFT_DOWN", "SENSOR_STUCK", "HIGH_NOISE"];
const FEED_LABELS: &[&str] = &["NORMAL", "INCREASE", "DECREASE"];
const AERATION_LABELS: &[&str] = &["ADEQUATE", "INCREASE_NEEDED", "CRITICAL_LOW"];

/// Fixed label set for the known prediction types (case-insensitive lookup).
pub fn canonical_labels(category_type: &str) -> Option<&'static [&'static str]> {
    match category_type.trim().to_uppercase().as_str() {
        "DO" => Some(DO_LABELS),
        "PH" => Some(PH_LABELS),
        "FEED" => Some(FEED_LABELS),
        "AERATION" => Some(AERATION_LABELS),
        _ => None,
    }
}
