//! Property tests for rule evaluation and matrix scoring.

use std::collections::HashMap;

use pond_core::{Snapshot, Verdict};
use pond_diagd::config::{DiagnosisMatrix, Expectation, MatrixRow, Operator, Rule};
use pond_diagd::scoring::matrix_scorer::has_conditions;
use pond_diagd::{MatrixScorer, MissingDataPolicy, RuleEvaluator, Table};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_operator() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Lt),
        Just(Operator::Gt),
        Just(Operator::Le),
        Just(Operator::Ge),
        Just(Operator::Eq),
    ]
}

fn arb_cell() -> impl Strategy<Value = String> {
    prop_oneof![
        (-50i32..50).prop_map(|v| v.to_string()),
        (-500i32..500).prop_map(|v| format!("{},{}", v / 10, (v % 10).abs())),
        Just(String::new()),
        Just("-".to_string()),
        Just("ON".to_string()),
        Just("off".to_string()),
    ]
}

fn arb_expectation() -> impl Strategy<Value = Expectation> {
    prop_oneof![
        Just(Expectation::Pass),
        Just(Expectation::Fail),
        Just(Expectation::DontCare),
    ]
}

/// Rules over a small column set, some pointing at absent tables/columns.
fn arb_rules() -> impl Strategy<Value = Vec<Rule>> {
    prop::collection::vec(
        (
            prop_oneof![Just("Alpha"), Just("Beta"), Just("Gamma"), Just("Missing")],
            prop_oneof![Just("Water Quality"), Just("Farm Control"), Just("Gone")],
            arb_operator(),
            arb_cell(),
        ),
        0..12,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (keyword, tab, op, value))| {
                Rule::new(&format!("P{}", i), keyword, tab, op, &value)
            })
            .collect()
    })
}

fn arb_table() -> impl Strategy<Value = Table> {
    prop::collection::vec(prop::collection::vec(arb_cell(), 0..4), 0..5).prop_map(|rows| {
        Table::new(
            vec!["Alpha".to_string(), "Beta".to_string(), "Gamma".to_string()],
            rows,
        )
    })
}

fn arb_snapshot(params: usize) -> impl Strategy<Value = Snapshot> {
    prop::collection::vec(any::<bool>(), params).prop_map(|verdicts| {
        let mut snapshot = Snapshot::new();
        for (i, pass) in verdicts.into_iter().enumerate() {
            snapshot.record(&format!("P{}", i), Verdict::from_bool(pass));
        }
        snapshot
    })
}

fn arb_matrix(params: usize) -> impl Strategy<Value = DiagnosisMatrix> {
    prop::collection::vec(
        (
            0u32..100,
            prop::collection::vec(arb_expectation(), params),
        ),
        0..10,
    )
    .prop_map(|rows| {
        DiagnosisMatrix::new(
            rows.into_iter()
                .enumerate()
                .map(|(i, (freq, expectations))| {
                    expectations.into_iter().enumerate().fold(
                        MatrixRow::new(&format!("D{}", i), freq as f64),
                        |row, (j, e)| row.expect(&format!("P{}", j), e),
                    )
                })
                .collect(),
        )
    })
}

fn arb_case() -> impl Strategy<Value = (Snapshot, DiagnosisMatrix)> {
    (0usize..8).prop_flat_map(|n| (arb_snapshot(n), arb_matrix(n)))
}

fn arb_policy() -> impl Strategy<Value = MissingDataPolicy> {
    prop_oneof![Just(MissingDataPolicy::FailClosed), Just(MissingDataPolicy::Exclude)]
}

// ============================================================================
// Rule evaluation
// ============================================================================

proptest! {
    #[test]
    fn prop_snapshot_has_one_entry_per_rule(
        rules in arb_rules(),
        water in arb_table(),
        farm in arb_table(),
    ) {
        let mut tables = HashMap::new();
        tables.insert("Water Quality".to_string(), water);
        tables.insert("Farm Control".to_string(), farm);

        let evaluation = RuleEvaluator::new().evaluate(&rules, &tables);
        prop_assert_eq!(evaluation.snapshot.len(), rules.len());
        for (rule, entry) in rules.iter().zip(evaluation.snapshot.entries()) {
            prop_assert_eq!(&rule.param, &entry.param);
            // A value is recorded exactly when the rule had evidence
            prop_assert_eq!(
                evaluation.data_values.contains_key(&rule.param),
                entry.missing.is_none()
            );
        }
    }
}

// ============================================================================
// Matrix scoring
// ============================================================================

proptest! {
    #[test]
    fn prop_scores_sorted_and_bounded((snapshot, matrix) in arb_case(), policy in arb_policy()) {
        let scorer = MatrixScorer::with_config(pond_diagd::scoring::ScorerConfig {
            missing_data: policy,
            ..Default::default()
        });
        let ranked = scorer.score(&snapshot, &matrix);

        for d in &ranked {
            prop_assert!(d.final_score >= 0.0 && d.final_score <= 100.0 + 1e-9);
            prop_assert!(d.match_ratio > 0.0 && d.match_ratio <= 100.0);
            prop_assert!(d.depth_weight > 0.0 && d.depth_weight <= 1.0);
            prop_assert!(d.prior >= 0.0 && d.prior <= 1.0);
            prop_assert!(d.matched >= 1 && d.matched <= d.total);
        }
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].final_score >= pair[1].final_score);
        }
    }

    #[test]
    fn prop_rows_without_conditions_never_scored((snapshot, matrix) in arb_case()) {
        let ranked = MatrixScorer::new().score(&snapshot, &matrix);
        for row in &matrix.rows {
            if !has_conditions(&snapshot, row) {
                prop_assert!(ranked.iter().all(|d| d.diagnosis != row.diagnosis));
            }
        }
    }

    #[test]
    fn prop_ties_keep_sheet_order((snapshot, matrix) in arb_case()) {
        let ranked = MatrixScorer::new().score(&snapshot, &matrix);
        let position = |name: &str| matrix.rows.iter().position(|r| r.diagnosis == name);
        for pair in ranked.windows(2) {
            if pair[0].final_score == pair[1].final_score {
                prop_assert!(position(&pair[0].diagnosis) < position(&pair[1].diagnosis));
            }
        }
    }
}
