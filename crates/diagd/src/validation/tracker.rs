// validation/tracker.rs
// Prediction/outcome bookkeeping and confusion-matrix reports

use std::collections::BTreeSet;
use std::sync::Arc;

use pond_core::{ErrorCode, ErrorReport};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::confusion::{improvement_areas, ConfusionMatrix, Improvement, Metrics};
use super::record::{canonical_labels, PredictionRecord};
use super::store::{PredictionStore, StoreError};
use crate::clock::Clock;

pub const DEFAULT_MIN_VALIDATED: usize = 5;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Confidence must be a finite number, got {0}")]
    InvalidConfidence(f64),
}

impl ValidationError {
    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(ErrorCode::ExternalServiceFailure, self.to_string())
    }
}

/// Result of `build_confusion_matrix`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfusionReport {
    InsufficientData {
        category_type: String,
        validated: usize,
        required: usize,
    },
    Success {
        category_type: String,
        matrix: ConfusionMatrix,
        validated: usize,
        /// `None` when every validated label fell outside the category set
        metrics: Option<Metrics>,
        improvements: Vec<Improvement>,
    },
}

impl ConfusionReport {
    pub fn error_report(&self) -> Option<ErrorReport> {
        match self {
            ConfusionReport::InsufficientData {
                category_type,
                validated,
                required,
            } => Some(
                ErrorReport::new(
                    ErrorCode::InsufficientSamples,
                    format!("Need at least {} validated records, have {}", required, validated),
                )
                .with_subject(category_type),
            ),
            ConfusionReport::Success { .. } => None,
        }
    }
}

/// Logs predictions, records their outcomes exactly once, and reports
/// model accuracy per prediction type.
pub struct ValidationTracker {
    store: Arc<dyn PredictionStore>,
    clock: Arc<dyn Clock>,
    min_validated: usize,
}

impl ValidationTracker {
    pub fn new(store: Arc<dyn PredictionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            min_validated: DEFAULT_MIN_VALIDATED,
        }
    }

    pub fn with_min_validated(mut self, min_validated: usize) -> Self {
        self.min_validated = min_validated;
        self
    }

    pub fn log_prediction(
        &self,
        category_type: &str,
        input_snapshot: serde_json::Value,
        predicted_label: &str,
        confidence: f64,
    ) -> Result<Uuid, ValidationError> {
        if !confidence.is_finite() {
            return Err(ValidationError::InvalidConfidence(confidence));
        }
        let record = PredictionRecord::new(
            self.clock.now(),
            category_type,
            input_snapshot,
            predicted_label,
            confidence,
        );
        self.store.insert(&record)?;
        info!(id = %record.id, category = %record.category_type, predicted = %record.predicted_label, "Prediction logged");
        Ok(record.id)
    }

    /// Set the outcome of an unvalidated record. `false` when the record is
    /// unknown or already validated; use `revalidate` to overwrite.
    pub fn record_outcome(&self, id: Uuid, actual_label: &str) -> Result<bool, ValidationError> {
        let Some(mut record) = self.store.get(id)? else {
            warn!(%id, "Outcome for unknown prediction");
            return Ok(false);
        };
        if record.validated {
            warn!(%id, "Prediction already validated, use revalidate to overwrite");
            return Ok(false);
        }
        self.apply(&mut record, actual_label)?;
        Ok(true)
    }

    /// Validate the most recent unvalidated record of a type.
    pub fn record_latest_outcome(
        &self,
        category_type: &str,
        actual_label: &str,
    ) -> Result<Option<Uuid>, ValidationError> {
        let latest = self
            .store
            .all()?
            .into_iter()
            .filter(|r| r.is_type(category_type) && !r.validated)
            .max_by_key(|r| r.timestamp);

        match latest {
            Some(mut record) => {
                self.apply(&mut record, actual_label)?;
                Ok(Some(record.id))
            }
            None => {
                warn!(category = category_type, "No pending prediction to validate");
                Ok(None)
            }
        }
    }

    /// Explicit overwrite of an outcome, validated or not.
    pub fn revalidate(&self, id: Uuid, actual_label: &str) -> Result<bool, ValidationError> {
        let Some(mut record) = self.store.get(id)? else {
            return Ok(false);
        };
        if let Some(previous) = &record.actual_label {
            info!(%id, previous = %previous, "Revalidating prediction");
        }
        self.apply(&mut record, actual_label)?;
        Ok(true)
    }

    fn apply(&self, record: &mut PredictionRecord, actual_label: &str) -> Result<(), ValidationError> {
        record.apply_outcome(actual_label, self.clock.now());
        self.store.update(record)?;
        info!(
            id = %record.id,
            actual = record.actual_label.as_deref().unwrap_or(""),
            correct = record.is_correct.unwrap_or(false),
            "Outcome recorded"
        );
        Ok(())
    }

    pub fn validated(&self, category_type: &str) -> Result<Vec<PredictionRecord>, ValidationError> {
        Ok(self
            .store
            .all()?
            .into_iter()
            .filter(|r| r.validated && r.is_type(category_type))
            .collect())
    }

    pub fn build_confusion_matrix(
        &self,
        category_type: &str,
    ) -> Result<ConfusionReport, ValidationError> {
        let validated = self.validated(category_type)?;
        if validated.len() < self.min_validated {
            return Ok(ConfusionReport::InsufficientData {
                category_type: category_type.to_string(),
                validated: validated.len(),
                required: self.min_validated,
            });
        }

        let categories: Vec<String> = match canonical_labels(category_type) {
            Some(labels) => labels.iter().map(|l| l.to_string()).collect(),
            None => validated
                .iter()
                .flat_map(|r| [Some(&r.predicted_label), r.actual_label.as_ref()])
                .flatten()
                .cloned()
                .collect::<BTreeSet<String>>()
                .into_iter()
                .collect(),
        };

        let matrix = ConfusionMatrix::build(
            categories,
            validated.iter().filter_map(|r| {
                r.actual_label
                    .as_deref()
                    .map(|actual| (actual, r.predicted_label.as_str()))
            }),
        );
        let metrics = matrix.metrics();
        let improvements = metrics
            .as_ref()
            .map(|m| improvement_areas(&matrix, m))
            .unwrap_or_default();

        Ok(ConfusionReport::Success {
            category_type: category_type.to_string(),
            matrix,
            validated: validated.len(),
            metrics,
            improvements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::validation::store::InMemoryPredictionStore;
    use chrono::{Duration, TimeZone, Utc};

    fn tracker() -> (ValidationTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ));
        let tracker = ValidationTracker::new(Arc::new(InMemoryPredictionStore::new()), clock.clone());
        (tracker, clock)
    }

    #[test]
    fn test_outcome_recorded_once() {
        let (t, _) = tracker();
        let id = t.log_prediction("DO", serde_json::json!({"do": 2.5}), "LOW", 0.8).unwrap();

        assert!(t.record_outcome(id, "LOW").unwrap());
        assert!(!t.record_outcome(id, "NORMAL").unwrap());
        let rec = &t.validated("DO").unwrap()[0];
        assert_eq!(rec.actual_label.as_deref(), Some("LOW"));
        assert_eq!(rec.is_correct, Some(true));

        assert!(t.revalidate(id, "NORMAL").unwrap());
        assert_eq!(t.validated("do").unwrap()[0].is_correct, Some(false));
    }

    #[test]
    fn test_non_finite_confidence_rejected() {
        let (t, _) = tracker();
        for confidence in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = t
                .log_prediction("DO", serde_json::json!({}), "LOW", confidence)
                .unwrap_err();
            assert!(matches!(err, ValidationError::InvalidConfidence(_)));
        }
        assert!(t.validated("DO").unwrap().is_empty());
        assert!(t.record_latest_outcome("DO", "LOW").unwrap().is_none());
    }

    #[test]
    fn test_unknown_record() {
        let (t, _) = tracker();
        assert!(!t.record_outcome(Uuid::new_v4(), "LOW").unwrap());
        assert!(!t.revalidate(Uuid::new_v4(), "LOW").unwrap());
    }

    #[test]
    fn test_latest_outcome_targets_newest_pending() {
        let (t, clock) = tracker();
        let first = t.log_prediction("pH", serde_json::json!({}), "NORMAL", 0.5).unwrap();
        clock.advance(Duration::minutes(5));
        let second = t.log_prediction("pH", serde_json::json!({}), "DRIFT_UP", 0.5).unwrap();
        clock.advance(Duration::minutes(5));
        t.log_prediction("DO", serde_json::json!({}), "LOW", 0.5).unwrap();

        assert_eq!(t.record_latest_outcome("PH", "DRIFT_UP").unwrap(), Some(second));
        assert_eq!(t.record_latest_outcome("pH", "NORMAL").unwrap(), Some(first));
        assert_eq!(t.record_latest_outcome("pH", "NORMAL").unwrap(), None);
    }

    #[test]
    fn test_insufficient_then_success() {
        let (t, _) = tracker();
        for label in ["LOW", "LOW", "NORMAL", "CRITICAL"] {
            let id = t.log_prediction("DO", serde_json::json!({}), label, 0.7).unwrap();
            t.record_outcome(id, label).unwrap();
        }
        let report = t.build_confusion_matrix("DO").unwrap();
        assert!(matches!(report, ConfusionReport::InsufficientData { validated: 4, required: 5, .. }));
        assert!(report.error_report().is_some());

        let id = t.log_prediction("DO", serde_json::json!({}), "NORMAL", 0.7).unwrap();
        t.record_outcome(id, "LOW").unwrap();

        match t.build_confusion_matrix("DO").unwrap() {
            ConfusionReport::Success {
                matrix, metrics, ..
            } => {
                assert_eq!(matrix.categories, vec!["NORMAL", "LOW", "CRITICAL"]);
                assert_eq!(matrix.get("LOW", "NORMAL"), Some(1));
                let metrics = metrics.unwrap();
                assert_eq!(metrics.correct, 4);
                assert_eq!(metrics.accuracy, 0.8);
            }
            other => panic!("unexpected report: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_uses_sorted_observed_labels() {
        let (t, _) = tracker();
        for (predicted, actual) in [("warm", "hot"), ("cold", "cold"), ("hot", "hot"), ("warm", "warm"), ("cold", "warm")] {
            let id = t.log_prediction("TEMP", serde_json::json!({}), predicted, 0.6).unwrap();
            t.record_outcome(id, actual).unwrap();
        }
        match t.build_confusion_matrix("TEMP").unwrap() {
            ConfusionReport::Success { matrix, .. } => {
                assert_eq!(matrix.categories, vec!["COLD", "HOT", "WARM"]);
                assert_eq!(matrix.total(), 5);
            }
            other => panic!("unexpected report: {other:?}"),
        }
    }
}
