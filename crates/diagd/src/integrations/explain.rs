// integrations/explain.rs
// Optional natural-language explanation of a diagnosis report

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::DiagnosisReport;

/// Runner-ups included in an explanation request
pub const EXPLAIN_RUNNER_UPS: usize = 2;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExplainError {
    #[error("Explanation service unavailable: {0}")]
    Unavailable(String),

    #[error("Explanation service quota exceeded")]
    QuotaExceeded,

    #[error("Explanation service timed out")]
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplainCandidate {
    pub diagnosis: String,
    pub confidence: u32,
    pub matched: usize,
    pub total: usize,
}

/// Everything an external model needs to phrase the result; no raw tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplanationRequest {
    pub top: Option<ExplainCandidate>,
    pub runner_ups: Vec<ExplainCandidate>,
    /// `param = value` lines, rule order
    pub sensor_values: Vec<String>,
    pub active_conditions: Vec<String>,
    pub emergencies: Vec<String>,
}

impl ExplanationRequest {
    pub fn from_report(report: &DiagnosisReport) -> Self {
        let candidate = |d: &crate::scoring::ScoredDiagnosis| ExplainCandidate {
            diagnosis: d.diagnosis.clone(),
            confidence: d.confidence(),
            matched: d.matched,
            total: d.total,
        };

        let sensor_values = report
            .snapshot
            .entries()
            .iter()
            .filter_map(|e| {
                report
                    .data_values
                    .get(&e.param)
                    .map(|v| format!("{} = {}", e.param, v.value))
            })
            .collect();

        Self {
            top: report.top().map(candidate),
            runner_ups: report
                .ranked
                .iter()
                .skip(1)
                .take(EXPLAIN_RUNNER_UPS)
                .map(candidate)
                .collect(),
            sensor_values,
            active_conditions: report
                .active_conditions()
                .into_iter()
                .map(str::to_string)
                .collect(),
            emergencies: report.emergencies.iter().map(|e| e.title.clone()).collect(),
        }
    }

    /// Plain-text context block for prompt-style services.
    pub fn context(&self) -> String {
        let mut out = String::new();
        match &self.top {
            Some(top) => out.push_str(&format!(
                "Top diagnosis: {} ({}%, {}/{} conditions)\n",
                top.diagnosis, top.confidence, top.matched, top.total
            )),
            None => out.push_str("Top diagnosis: none\n"),
        }
        for r in &self.runner_ups {
            out.push_str(&format!("Alternative: {} ({}%)\n", r.diagnosis, r.confidence));
        }
        if !self.emergencies.is_empty() {
            out.push_str(&format!("Emergencies: {}\n", self.emergencies.join(", ")));
        }
        if !self.active_conditions.is_empty() {
            out.push_str(&format!(
                "Active conditions: {}\n",
                self.active_conditions.join(", ")
            ));
        }
        for v in &self.sensor_values {
            out.push_str(&format!("Sensor: {}\n", v));
        }
        out
    }
}

pub trait ExplanationService: Send + Sync {
    fn explain(&self, request: &ExplanationRequest) -> Result<String, ExplainError>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Explanation {
    Generated { text: String },
    Unavailable { reason: String },
}

impl Explanation {
    pub fn text(&self) -> Option<&str> {
        match self {
            Explanation::Generated { text } => Some(text),
            Explanation::Unavailable { .. } => None,
        }
    }
}

/// Ask the service for an explanation. A failure never fails the caller;
/// the report stands on its own.
pub fn explain_best_effort(service: &dyn ExplanationService, report: &DiagnosisReport) -> Explanation {
    let request = ExplanationRequest::from_report(report);
    match service.explain(&request) {
        Ok(text) => {
            debug!(chars = text.len(), "Explanation generated");
            Explanation::Generated { text }
        }
        Err(ExplainError::QuotaExceeded) => {
            warn!("Explanation quota exceeded");
            Explanation::Unavailable {
                reason: "quota exceeded, try again later".to_string(),
            }
        }
        Err(e) => {
            warn!(error = %e, "Explanation failed");
            Explanation::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoredDiagnosis;
    use crate::settings::DisplaySettings;
    use chrono::Utc;
    use pond_core::{DataValue, Snapshot, Verdict};
    use std::collections::HashMap;

    struct Fixed(Result<String, ExplainError>);

    impl ExplanationService for Fixed {
        fn explain(&self, _request: &ExplanationRequest) -> Result<String, ExplainError> {
            self.0.clone()
        }
    }

    fn scored(name: &str, score: f64) -> ScoredDiagnosis {
        ScoredDiagnosis {
            index: String::new(),
            diagnosis: name.to_string(),
            final_score: score,
            match_ratio: 100.0,
            matched: 2,
            total: 3,
            frequency: 10.0,
            depth_weight: 0.5,
            prior: 0.2,
            cost: None,
        }
    }

    fn report() -> DiagnosisReport {
        let mut snapshot = Snapshot::new();
        snapshot.record("Low DO", Verdict::Pass);
        snapshot.record("High pH", Verdict::Fail);
        let mut data_values = HashMap::new();
        data_values.insert(
            "Low DO".to_string(),
            DataValue {
                value: "2.4".to_string(),
                column: "DO".to_string(),
                tab: "Water Quality".to_string(),
            },
        );
        DiagnosisReport {
            generated_at: Utc::now(),
            config_version: "abc".to_string(),
            snapshot,
            data_values,
            emergencies: Vec::new(),
            ranked: vec![scored("A", 70.5), scored("B", 50.0), scored("C", 45.0), scored("D", 41.0)],
            display: DisplaySettings::default(),
        }
    }

    #[test]
    fn test_request_from_report() {
        let req = ExplanationRequest::from_report(&report());
        assert_eq!(req.top.as_ref().unwrap().confidence, 70);
        assert_eq!(req.runner_ups.len(), 2);
        assert_eq!(req.sensor_values, vec!["Low DO = 2.4"]);
        assert_eq!(req.active_conditions, vec!["Low DO"]);
        assert!(req.context().contains("Top diagnosis: A (70%, 2/3 conditions)"));
    }

    #[test]
    fn test_failures_degrade() {
        let r = report();
        let ok = explain_best_effort(&Fixed(Ok("Likely an oxygen crash.".to_string())), &r);
        assert_eq!(ok.text(), Some("Likely an oxygen crash."));

        let quota = explain_best_effort(&Fixed(Err(ExplainError::QuotaExceeded)), &r);
        assert!(matches!(quota, Explanation::Unavailable { ref reason } if reason.contains("quota")));

        let timeout = explain_best_effort(&Fixed(Err(ExplainError::Timeout)), &r);
        assert!(timeout.text().is_none());
    }
}
