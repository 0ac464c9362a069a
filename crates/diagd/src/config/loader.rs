// config/loader.rs
// Parses the rules sheet and the matrix sheet into a DiagnosisConfig

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::types::{DiagnosisConfig, DiagnosisMatrix, Expectation, MatrixRow, Operator, Rule};
use super::ConfigError;
use crate::numeric::parse_number;
use crate::source::{Table, TabularDataSource};

pub const DEFAULT_RULES_TABLE: &str = "Diagnosis_Rules";
pub const DEFAULT_MATRIX_TABLE: &str = "Matrix Diagnosis";

/// Fixed matrix prefix columns: index, frequency, diagnosis name
const MATRIX_INDEX_COL: usize = 0;
const MATRIX_FREQ_COL: usize = 1;
const MATRIX_NAME_COL: usize = 2;

/// Reads the two config tables. Never touches sensor tables.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub rules_table: String,
    pub matrix_table: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            rules_table: DEFAULT_RULES_TABLE.to_string(),
            matrix_table: DEFAULT_MATRIX_TABLE.to_string(),
        }
    }
}

impl ConfigLoader {
    pub fn new(rules_table: &str, matrix_table: &str) -> Self {
        Self {
            rules_table: rules_table.to_string(),
            matrix_table: matrix_table.to_string(),
        }
    }

    /// Fetch both tables and build one config. Either fetch failing fails the load.
    pub fn load(
        &self,
        source: &dyn TabularDataSource,
        now: DateTime<Utc>,
    ) -> Result<DiagnosisConfig, ConfigError> {
        let rules_table = source
            .get_table(&self.rules_table)
            .map_err(|e| ConfigError::Unavailable {
                table: self.rules_table.clone(),
                source: e,
            })?;
        let matrix_table = source
            .get_table(&self.matrix_table)
            .map_err(|e| ConfigError::Unavailable {
                table: self.matrix_table.clone(),
                source: e,
            })?;

        if rules_table.is_empty() {
            return Err(ConfigError::Malformed(format!(
                "table '{}' has no header row",
                self.rules_table
            )));
        }

        let rules = parse_rules(&rules_table);
        let matrix = parse_matrix(&matrix_table, &rules);
        Ok(DiagnosisConfig::new(rules, matrix, now))
    }
}

/// Rules sheet: `param | keyword | tab_source | operator | value | logic`.
pub fn parse_rules(table: &Table) -> Vec<Rule> {
    let mut rules: Vec<Rule> = Vec::new();

    for (i, row) in table.rows.iter().enumerate() {
        if row.len() < 5 {
            continue;
        }
        let param = row[0].trim();
        let tab_source = row[2].trim();
        if param.is_empty() || tab_source.is_empty() || tab_source == "UNKNOWN" {
            continue;
        }

        let Some(operator) = Operator::parse(&row[3]) else {
            warn!(row = i + 2, param, operator = %row[3], "Skipping rule with unknown operator");
            continue;
        };

        if rules.iter().any(|r| r.param == param) {
            debug!(row = i + 2, param, "Duplicate rule param, keeping first definition");
            continue;
        }

        rules.push(Rule {
            param: param.to_string(),
            keyword: row[1].trim().to_string(),
            tab_source: tab_source.to_string(),
            operator,
            value: row[4].trim().to_string(),
            logic: row.get(5).map(|s| s.trim().to_string()).unwrap_or_default(),
        });
    }

    rules
}

/// Matrix sheet. Parameter columns are headers equal to a rule param; the
/// cost column is the first header mentioning "cost".
pub fn parse_matrix(table: &Table, rules: &[Rule]) -> DiagnosisMatrix {
    let mut param_cols: Vec<(String, usize)> = Vec::new();
    let mut cost_col: Option<usize> = None;

    for (i, header) in table.headers.iter().enumerate() {
        let clean = header.trim();
        if rules.iter().any(|r| r.param == clean) && !param_cols.iter().any(|(p, _)| p == clean) {
            param_cols.push((clean.to_string(), i));
        }
        if cost_col.is_none() && header.to_lowercase().contains("cost") {
            cost_col = Some(i);
        }
    }

    let mut rows = Vec::new();
    for row in &table.rows {
        let Some(name) = row.get(MATRIX_NAME_COL).map(|s| s.trim()) else {
            continue;
        };
        if !MatrixRow::is_eligible_name(name) {
            continue;
        }

        let mut frequency = row
            .get(MATRIX_FREQ_COL)
            .and_then(|c| parse_number(c))
            .unwrap_or(0.0);
        if frequency < 0.0 {
            warn!(diagnosis = name, frequency, "Negative frequency, using 0");
            frequency = 0.0;
        }

        let mut expected = BTreeMap::new();
        for (param, col) in &param_cols {
            let Some(cell) = row.get(*col) else {
                continue;
            };
            expected.insert(param.clone(), Expectation::parse(cell));
        }

        rows.push(MatrixRow {
            index: row
                .get(MATRIX_INDEX_COL)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            diagnosis: name.to_string(),
            frequency,
            cost: cost_col.and_then(|c| row.get(c)).and_then(|c| parse_number(c)),
            expected,
        });
    }

    DiagnosisMatrix {
        params: param_cols.into_iter().map(|(p, _)| p).collect(),
        rows,
    }
}
