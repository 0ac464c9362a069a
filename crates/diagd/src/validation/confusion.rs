// validation/confusion.rs
// Confusion matrix, per-class metrics and improvement candidates

use std::collections::BTreeMap;

use pond_core::Urgency;
use serde::{Deserialize, Serialize};

use crate::numeric::round_to;

/// Below this precision or recall a class is an improvement candidate.
pub const IMPROVEMENT_THRESHOLD: f64 = 0.7;
/// Below this it is a HIGH priority candidate.
pub const HIGH_PRIORITY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Records whose actual label is this class
    pub support: usize,
    /// Records predicted as this class
    pub predicted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    pub accuracy: f64,
    pub total: usize,
    pub correct: usize,
    /// Keyed by category, iterate `ConfusionMatrix::categories` for order
    pub per_class: BTreeMap<String, PerClassMetrics>,
}

/// Square count matrix: rows = actual, columns = predicted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfusionMatrix {
    pub categories: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Count `(actual, predicted)` pairs; pairs with a label outside
    /// `categories` are ignored.
    pub fn build<'a>(
        categories: Vec<String>,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let n = categories.len();
        let mut counts = vec![vec![0usize; n]; n];
        for (actual, predicted) in pairs {
            let a = categories.iter().position(|c| c == actual);
            let p = categories.iter().position(|c| c == predicted);
            if let (Some(a), Some(p)) = (a, p) {
                counts[a][p] += 1;
            }
        }
        Self { categories, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn get(&self, actual: &str, predicted: &str) -> Option<usize> {
        let a = self.categories.iter().position(|c| c == actual)?;
        let p = self.categories.iter().position(|c| c == predicted)?;
        Some(self.counts[a][p])
    }

    /// Accuracy and per-class precision/recall/F1, 3 decimals. `None` when
    /// no counted pair fell inside the category set.
    pub fn metrics(&self) -> Option<Metrics> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let n = self.categories.len();
        let correct: usize = (0..n).map(|i| self.counts[i][i]).sum();

        let mut per_class = BTreeMap::new();
        for (i, category) in self.categories.iter().enumerate() {
            let tp = self.counts[i][i];
            let support: usize = self.counts[i].iter().sum();
            let predicted: usize = (0..n).map(|j| self.counts[j][i]).sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            per_class.insert(
                category.clone(),
                PerClassMetrics {
                    precision: round_to(precision, 3),
                    recall: round_to(recall, 3),
                    f1: round_to(f1, 3),
                    support,
                    predicted,
                },
            );
        }

        Some(Metrics {
            accuracy: round_to(correct as f64 / total as f64, 3),
            total,
            correct,
            per_class,
        })
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImprovementIssue {
    LowPrecision,
    LowRecall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Improvement {
    pub category: String,
    pub issue: ImprovementIssue,
    pub value: f64,
    pub priority: Urgency,
    pub suggestion: String,
}

/// Classes with precision or recall under 0.7, HIGH (< 0.5) first, then
/// category order, precision before recall. A class that never occurred
/// and was never predicted scores 0 on both and is flagged HIGH.
pub fn improvement_areas(matrix: &ConfusionMatrix, metrics: &Metrics) -> Vec<Improvement> {
    let mut improvements = Vec::new();

    for category in &matrix.categories {
        let Some(m) = metrics.per_class.get(category) else {
            continue;
        };
        if m.precision < IMPROVEMENT_THRESHOLD {
            improvements.push(Improvement {
                category: category.clone(),
                issue: ImprovementIssue::LowPrecision,
                value: m.precision,
                priority: priority(m.precision),
                suggestion: format!(
                    "Too many false positives for '{}'. Tighten the detection threshold.",
                    category
                ),
            });
        }
        if m.recall < IMPROVEMENT_THRESHOLD {
            improvements.push(Improvement {
                category: category.clone(),
                issue: ImprovementIssue::LowRecall,
                value: m.recall,
                priority: priority(m.recall),
                suggestion: format!(
                    "'{}' is often missed. Loosen the threshold or add features.",
                    category
                ),
            });
        }
    }

    improvements.sort_by_key(|i| std::cmp::Reverse(i.priority));
    improvements
}

fn priority(value: f64) -> Urgency {
    if value < HIGH_PRIORITY_THRESHOLD {
        Urgency::High
    } else {
        Urgency::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_ignores_unknown_labels() {
        let m = ConfusionMatrix::build(
            cats(&["NORMAL", "LOW", "CRITICAL"]),
            vec![("LOW", "LOW"), ("LOW", "NORMAL"), ("WEIRD", "LOW")],
        );
        assert_eq!(m.total(), 2);
        assert_eq!(m.get("LOW", "NORMAL"), Some(1));
        assert_eq!(m.get("WEIRD", "LOW"), None);
    }

    #[test]
    fn test_metrics() {
        // actual NORMAL: 3 predicted NORMAL, 1 predicted LOW
        // actual LOW: 2 predicted LOW
        let pairs = vec![
            ("NORMAL", "NORMAL"),
            ("NORMAL", "NORMAL"),
            ("NORMAL", "NORMAL"),
            ("NORMAL", "LOW"),
            ("LOW", "LOW"),
            ("LOW", "LOW"),
        ];
        let m = ConfusionMatrix::build(cats(&["NORMAL", "LOW", "CRITICAL"]), pairs);
        let metrics = m.metrics().unwrap();
        assert_eq!(metrics.total, 6);
        assert_eq!(metrics.correct, 5);
        assert_eq!(metrics.accuracy, 0.833);

        let normal = &metrics.per_class["NORMAL"];
        assert_eq!(normal.precision, 1.0);
        assert_eq!(normal.recall, 0.75);
        assert_eq!(normal.f1, 0.857);
        assert_eq!(normal.support, 4);

        let low = &metrics.per_class["LOW"];
        assert_eq!(low.precision, 0.667);
        assert_eq!(low.recall, 1.0);

        let improvements = improvement_areas(&m, &metrics);
        assert_eq!(improvements.len(), 3);
        assert_eq!(improvements[2].category, "LOW");
        assert_eq!(improvements[2].issue, ImprovementIssue::LowPrecision);
        assert_eq!(improvements[2].priority, Urgency::Medium);
    }

    #[test]
    fn test_unobserved_classes_flagged_high() {
        let pairs = vec![("NORMAL", "NORMAL"); 5];
        let m = ConfusionMatrix::build(cats(&["NORMAL", "LOW", "CRITICAL"]), pairs);
        let metrics = m.metrics().unwrap();
        assert_eq!(metrics.per_class["LOW"].precision, 0.0);
        assert_eq!(metrics.per_class["LOW"].recall, 0.0);

        let flagged: Vec<(String, ImprovementIssue, Urgency)> = improvement_areas(&m, &metrics)
            .into_iter()
            .map(|i| (i.category, i.issue, i.priority))
            .collect();
        assert_eq!(
            flagged,
            vec![
                ("LOW".to_string(), ImprovementIssue::LowPrecision, Urgency::High),
                ("LOW".to_string(), ImprovementIssue::LowRecall, Urgency::High),
                ("CRITICAL".to_string(), ImprovementIssue::LowPrecision, Urgency::High),
                ("CRITICAL".to_string(), ImprovementIssue::LowRecall, Urgency::High),
            ]
        );
    }

    #[test]
    fn test_high_priority_first_then_category_order() {
        let pairs = vec![
            ("A", "A"),
            ("A", "A"),
            ("A", "B"),
            ("B", "A"),
            ("B", "A"),
            ("B", "B"),
        ];
        let m = ConfusionMatrix::build(cats(&["A", "B"]), pairs);
        let metrics = m.metrics().unwrap();
        // A: precision 0.5, recall 0.667; B: precision 0.5, recall 0.333
        let order: Vec<(String, ImprovementIssue, Urgency)> = improvement_areas(&m, &metrics)
            .into_iter()
            .map(|i| (i.category, i.issue, i.priority))
            .collect();
        assert_eq!(
            order,
            vec![
                ("B".to_string(), ImprovementIssue::LowRecall, Urgency::High),
                ("A".to_string(), ImprovementIssue::LowPrecision, Urgency::Medium),
                ("A".to_string(), ImprovementIssue::LowRecall, Urgency::Medium),
                ("B".to_string(), ImprovementIssue::LowPrecision, Urgency::Medium),
            ]
        );
    }

    #[test]
    fn test_empty_matrix_has_no_metrics() {
        let m = ConfusionMatrix::build(cats(&["A"]), Vec::new());
        assert!(m.metrics().is_none());
    }
}
