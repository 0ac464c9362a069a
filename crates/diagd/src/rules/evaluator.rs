// rules/evaluator.rs
// Rule set + fresh tables → PASS/FAIL snapshot and the values behind it

use std::collections::HashMap;

use pond_core::{DataValue, MissingReason, Snapshot, Verdict};
use tracing::debug;

use super::column::resolve_column;
use crate::config::{Operator, Rule};
use crate::numeric::parse_number;
use crate::source::Table;

/// Result of one evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Exactly one entry per rule, in rule order
    pub snapshot: Snapshot,
    /// Observed values keyed by rule param; absent for fail-closed entries
    pub data_values: HashMap<String, DataValue>,
}

/// Stateless rule evaluator. Never fails per rule: missing evidence is a
/// fail-closed FAIL tagged with the reason.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, rules: &[Rule], tables: &HashMap<String, Table>) -> Evaluation {
        let mut evaluation = Evaluation::default();

        for rule in rules {
            let Some(table) = tables.get(&rule.tab_source).filter(|t| !t.is_empty()) else {
                debug!(param = %rule.param, tab = %rule.tab_source, "Rule table unavailable");
                evaluation
                    .snapshot
                    .record_missing(&rule.param, MissingReason::TableUnavailable);
                continue;
            };

            let Some(column) = resolve_column(&table.headers, &rule.keyword) else {
                debug!(param = %rule.param, keyword = %rule.keyword, "Rule column not found");
                evaluation
                    .snapshot
                    .record_missing(&rule.param, MissingReason::ColumnNotFound);
                continue;
            };

            let Some(latest) = latest_value(table, column.index) else {
                debug!(param = %rule.param, column = column.header, "Rule column has no value");
                evaluation
                    .snapshot
                    .record_missing(&rule.param, MissingReason::NoValue);
                continue;
            };

            let verdict = Verdict::from_bool(compare(latest, rule.operator, &rule.value));
            evaluation.snapshot.record(&rule.param, verdict);
            evaluation.data_values.insert(
                rule.param.clone(),
                DataValue {
                    value: latest.to_string(),
                    column: column.header.to_string(),
                    tab: rule.tab_source.clone(),
                },
            );
        }

        evaluation
    }
}

/// Newest non-blank cell of a column. Rows are oldest first and may be
/// shorter than the header row.
pub fn latest_value(table: &Table, col: usize) -> Option<&str> {
    table
        .rows
        .iter()
        .rev()
        .filter_map(|row| row.get(col))
        .map(|cell| cell.trim())
        .find(|cell| !cell.is_empty())
}

/// Numeric comparison first; only `=` falls back to case-insensitive text
/// equality when either side is not a number.
pub fn compare(observed: &str, operator: Operator, threshold: &str) -> bool {
    match (parse_number(observed), parse_number(threshold)) {
        (Some(lhs), Some(rhs)) => operator.compare(lhs, rhs),
        _ => {
            operator == Operator::Eq
                && observed.trim().to_lowercase() == threshold.trim().to_lowercase()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> HashMap<String, Table> {
        let mut tables = HashMap::new();
        tables.insert(
            "Water Quality".to_string(),
            Table::from_strs(
                &["Timestamp", "Device", "DO", "pH"],
                &[
                    &["2025-01-01 06:00:00", "ESP_01", "5,2", "7.1"],
                    &["2025-01-01 07:00:00", "ESP_01", "2,8", ""],
                    &["2025-01-01 08:00:00", "ESP_01"],
                ],
            ),
        );
        tables.insert(
            "Farm Control".to_string(),
            Table::from_strs(&["Timestamp", "AC Status"], &[&["2025-01-01 08:00:00", "off"]]),
        );
        tables.insert("Empty".to_string(), Table::default());
        tables
    }

    #[test]
    fn test_latest_non_empty_value_wins() {
        let rules = vec![
            Rule::new("Low DO", "do", "Water Quality", Operator::Lt, "3"),
            Rule::new("High pH", "ph", "Water Quality", Operator::Gt, "7,0"),
        ];
        let eval = RuleEvaluator::new().evaluate(&rules, &tables());

        assert_eq!(eval.snapshot.get("Low DO"), Some(Verdict::Pass));
        assert_eq!(eval.data_values["Low DO"].value, "2,8");
        assert_eq!(eval.data_values["Low DO"].column, "DO");
        assert_eq!(eval.snapshot.get("High pH"), Some(Verdict::Pass));
        assert_eq!(eval.data_values["High pH"].value, "7.1");
    }

    #[test]
    fn test_text_equality_only_for_eq() {
        let rules = vec![
            Rule::new("Power Outage", "AC", "Farm Control", Operator::Eq, "OFF"),
            Rule::new("Power Weird", "AC", "Farm Control", Operator::Lt, "OFF"),
        ];
        let eval = RuleEvaluator::new().evaluate(&rules, &tables());
        assert_eq!(eval.snapshot.get("Power Outage"), Some(Verdict::Pass));
        assert_eq!(eval.snapshot.get("Power Weird"), Some(Verdict::Fail));
        assert!(!eval.snapshot.is_missing("Power Weird"));
    }

    #[test]
    fn test_missing_evidence_fails_closed() {
        let rules = vec![
            Rule::new("A", "DO", "Nowhere", Operator::Lt, "3"),
            Rule::new("B", "DO", "Empty", Operator::Lt, "3"),
            Rule::new("C", "ammonia", "Water Quality", Operator::Gt, "1"),
            Rule::new("D", "Device", "Farm Control", Operator::Gt, "1"),
        ];
        let eval = RuleEvaluator::new().evaluate(&rules, &tables());
        assert_eq!(eval.snapshot.len(), 4);
        for param in ["A", "B", "C", "D"] {
            assert_eq!(eval.snapshot.get(param), Some(Verdict::Fail));
            assert!(eval.snapshot.is_missing(param));
        }
        assert_eq!(
            eval.snapshot.entry("A").unwrap().missing,
            Some(MissingReason::TableUnavailable)
        );
        assert_eq!(
            eval.snapshot.entry("C").unwrap().missing,
            Some(MissingReason::ColumnNotFound)
        );
        assert!(eval.data_values.is_empty());
    }

    #[test]
    fn test_no_value_in_column() {
        let mut t = HashMap::new();
        t.insert(
            "T".to_string(),
            Table::from_strs(&["Timestamp", "DO"], &[&["x", " "], &["y"]]),
        );
        let eval = RuleEvaluator::new().evaluate(&[Rule::new("Low DO", "DO", "T", Operator::Lt, "3")], &t);
        assert_eq!(eval.snapshot.entry("Low DO").unwrap().missing, Some(MissingReason::NoValue));
    }

    #[test]
    fn test_empty_rule_set() {
        let eval = RuleEvaluator::new().evaluate(&[], &tables());
        assert!(eval.snapshot.is_empty());
        assert!(eval.data_values.is_empty());
    }

    #[test]
    fn test_compare_boundaries() {
        assert!(compare("3", Operator::Le, "3,0"));
        assert!(!compare("3", Operator::Lt, "3"));
        assert!(compare("ON", Operator::Eq, " on "));
        assert!(!compare("ON", Operator::Ge, "ON"));
    }
}
