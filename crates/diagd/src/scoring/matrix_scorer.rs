// scoring/matrix_scorer.rs
// Snapshot × knowledge base → ranked differential diagnosis

use pond_core::Snapshot;
use serde::{Deserialize, Serialize};

use super::scored_diagnosis::ScoredDiagnosis;
use crate::config::{DiagnosisMatrix, Expectation, MatrixRow};

pub const DEPTH_CAP: usize = 6;
pub const DATA_WEIGHT: f64 = 0.7;
pub const PRIOR_WEIGHT: f64 = 0.3;

/// How fail-closed snapshot entries (no table, column or value behind
/// them) take part in matching.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingDataPolicy {
    /// Missing evidence counts as an observed FAIL
    #[default]
    FailClosed,
    /// Missing evidence is skipped, as if the cell were don't-care
    Exclude,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScorerConfig {
    /// Conditions needed for full evidence weight
    #[serde(default = "default_depth_cap")]
    pub depth_cap: usize,
    /// Weight of live evidence in the final score
    #[serde(default = "default_data_weight")]
    pub data_weight: f64,
    /// Weight of the historical base rate
    #[serde(default = "default_prior_weight")]
    pub prior_weight: f64,
    #[serde(default)]
    pub missing_data: MissingDataPolicy,
}

fn default_depth_cap() -> usize {
    DEPTH_CAP
}

fn default_data_weight() -> f64 {
    DATA_WEIGHT
}

fn default_prior_weight() -> f64 {
    PRIOR_WEIGHT
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            depth_cap: DEPTH_CAP,
            data_weight: DATA_WEIGHT,
            prior_weight: PRIOR_WEIGHT,
            missing_data: MissingDataPolicy::default(),
        }
    }
}

impl ScorerConfig {
    /// Weights must be non-negative and sum to at most 1 so final scores
    /// stay within 0..=100.
    pub fn validate(&self) -> Result<(), String> {
        if self.depth_cap == 0 {
            return Err("scoring.depth_cap must be at least 1".to_string());
        }
        for (name, weight) in [("data_weight", self.data_weight), ("prior_weight", self.prior_weight)] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("scoring.{} must be a non-negative number, got {}", name, weight));
            }
        }
        if self.data_weight + self.prior_weight > 1.0 + 1e-9 {
            return Err(format!(
                "scoring weights sum to {}, must not exceed 1",
                self.data_weight + self.prior_weight
            ));
        }
        Ok(())
    }
}

/// Matrix scorer
///
/// Per eligible row:
/// - `total` = params with a PASS/FAIL expectation that the snapshot holds
/// - `matched` = those whose expectation equals the snapshot verdict
/// - `match_ratio = matched / total * 100`
/// - `depth_weight = min(total, cap) / cap`
/// - `final = match_ratio * depth_weight * data_w + prior * 100 * prior_w`
///
/// Rows with no conditions or no matches are dropped. Output is sorted by
/// `final_score` descending; the sort is stable so ties keep sheet order.
#[derive(Debug, Clone, Default)]
pub struct MatrixScorer {
    config: ScorerConfig,
}

impl MatrixScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn score(&self, snapshot: &Snapshot, matrix: &DiagnosisMatrix) -> Vec<ScoredDiagnosis> {
        let total_frequency = matrix.total_frequency();

        let mut results: Vec<ScoredDiagnosis> = matrix
            .rows
            .iter()
            .filter_map(|row| self.score_row(snapshot, row, total_frequency))
            .collect();

        results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        results
    }

    fn score_row(
        &self,
        snapshot: &Snapshot,
        row: &MatrixRow,
        total_frequency: f64,
    ) -> Option<ScoredDiagnosis> {
        let mut total = 0usize;
        let mut matched = 0usize;

        for (param, expectation) in &row.expected {
            let Some(expected) = expectation.verdict() else {
                continue;
            };
            let Some(entry) = snapshot.entry(param) else {
                continue;
            };
            if entry.missing.is_some() && self.config.missing_data == MissingDataPolicy::Exclude {
                continue;
            }
            total += 1;
            if entry.verdict == expected {
                matched += 1;
            }
        }

        if total == 0 || matched == 0 {
            return None;
        }

        let cap = self.config.depth_cap.max(1);
        let match_ratio = matched as f64 / total as f64 * 100.0;
        let depth_weight = total.min(cap) as f64 / cap as f64;
        let weighted = match_ratio * depth_weight;
        let prior = if total_frequency > 0.0 {
            row.frequency / total_frequency
        } else {
            0.0
        };
        let final_score =
            weighted * self.config.data_weight + prior * 100.0 * self.config.prior_weight;

        Some(ScoredDiagnosis {
            index: row.index.clone(),
            diagnosis: row.diagnosis.clone(),
            final_score,
            match_ratio,
            matched,
            total,
            frequency: row.frequency,
            depth_weight,
            prior,
            cost: row.cost,
        })
    }
}

/// Whether a row would contribute any condition at all for this snapshot.
pub fn has_conditions(snapshot: &Snapshot, row: &MatrixRow) -> bool {
    row.expected
        .iter()
        .any(|(param, e)| *e != Expectation::DontCare && snapshot.contains(param))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pond_core::{MissingReason, Verdict};

    fn snapshot(pairs: &[(&str, Verdict)]) -> Snapshot {
        let mut s = Snapshot::new();
        for (p, v) in pairs {
            s.record(p, *v);
        }
        s
    }

    #[test]
    fn test_config_validation() {
        assert!(ScorerConfig::default().validate().is_ok());

        let heavy = ScorerConfig {
            data_weight: 0.9,
            prior_weight: 0.3,
            ..ScorerConfig::default()
        };
        assert!(heavy.validate().unwrap_err().contains("must not exceed 1"));

        let negative = ScorerConfig {
            prior_weight: -0.1,
            ..ScorerConfig::default()
        };
        assert!(negative.validate().is_err());

        let no_cap = ScorerConfig {
            depth_cap: 0,
            ..ScorerConfig::default()
        };
        assert!(no_cap.validate().is_err());
    }

    #[test]
    fn test_two_candidate_example() {
        use Expectation::*;
        let snap = snapshot(&[
            ("P1", Verdict::Pass),
            ("P2", Verdict::Pass),
            ("P3", Verdict::Fail),
            ("P4", Verdict::Pass),
        ]);
        let matrix = DiagnosisMatrix::new(vec![
            MatrixRow::new("B", 30.0)
                .expect("P1", Pass)
                .expect("P2", Fail)
                .expect("P3", Pass)
                .expect("P4", Pass),
            MatrixRow::new("A", 70.0)
                .expect("P1", Pass)
                .expect("P2", Pass)
                .expect("P3", Fail),
        ]);

        let ranked = MatrixScorer::new().score(&snap, &matrix);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].diagnosis, "A");
        assert!((ranked[0].final_score - 56.0).abs() < 1e-9);
        assert_eq!((ranked[0].matched, ranked[0].total), (3, 3));
        assert!((ranked[0].depth_weight - 0.5).abs() < 1e-9);

        assert_eq!(ranked[1].diagnosis, "B");
        assert_eq!((ranked[1].matched, ranked[1].total), (2, 4));
        // 50 * 4/6 * 0.7 + 30 * 0.3
        assert!((ranked[1].final_score - (50.0 * 4.0 / 6.0 * 0.7 + 9.0)).abs() < 1e-9);
    }

    #[test]
    fn test_zero_condition_and_zero_match_rows_dropped() {
        use Expectation::*;
        let snap = snapshot(&[("P1", Verdict::Pass)]);
        let matrix = DiagnosisMatrix::new(vec![
            MatrixRow::new("dont-care only", 10.0).expect("P1", DontCare),
            MatrixRow::new("unknown param", 10.0).expect("P9", Pass),
            MatrixRow::new("no match", 10.0).expect("P1", Fail),
            MatrixRow::new("hit", 10.0).expect("P1", Pass),
        ]);
        let ranked = MatrixScorer::new().score(&snap, &matrix);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].diagnosis, "hit");
        assert!((ranked[0].prior - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_ties_keep_matrix_order() {
        use Expectation::*;
        let snap = snapshot(&[("P1", Verdict::Pass)]);
        let matrix = DiagnosisMatrix::new(vec![
            MatrixRow::new("first", 5.0).expect("P1", Pass),
            MatrixRow::new("second", 5.0).expect("P1", Pass),
            MatrixRow::new("third", 5.0).expect("P1", Pass),
        ]);
        let names: Vec<String> = MatrixScorer::new()
            .score(&snap, &matrix)
            .into_iter()
            .map(|d| d.diagnosis)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_zero_total_frequency_gives_zero_prior() {
        let snap = snapshot(&[("P1", Verdict::Pass)]);
        let matrix =
            DiagnosisMatrix::new(vec![MatrixRow::new("x", 0.0).expect("P1", Expectation::Pass)]);
        let ranked = MatrixScorer::new().score(&snap, &matrix);
        assert_eq!(ranked[0].prior, 0.0);
        assert!((ranked[0].final_score - 100.0 / 6.0 * 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_missing_data_policy() {
        use Expectation::*;
        let mut snap = snapshot(&[("P1", Verdict::Pass)]);
        snap.record_missing("P2", MissingReason::ColumnNotFound);
        let matrix = DiagnosisMatrix::new(vec![MatrixRow::new("x", 1.0)
            .expect("P1", Pass)
            .expect("P2", Fail)]);

        let closed = MatrixScorer::new().score(&snap, &matrix);
        assert_eq!((closed[0].matched, closed[0].total), (2, 2));

        let excluded = MatrixScorer::with_config(ScorerConfig {
            missing_data: MissingDataPolicy::Exclude,
            ..ScorerConfig::default()
        })
        .score(&snap, &matrix);
        assert_eq!((excluded[0].matched, excluded[0].total), (1, 1));
    }

    #[test]
    fn test_has_conditions() {
        let snap = snapshot(&[("P1", Verdict::Pass)]);
        assert!(has_conditions(&snap, &MatrixRow::new("x", 1.0).expect("P1", Expectation::Fail)));
        assert!(!has_conditions(&snap, &MatrixRow::new("x", 1.0).expect("P1", Expectation::DontCare)));
    }
}
