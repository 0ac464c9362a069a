// config/types.rs
// Rule set and diagnosis matrix, loaded together as one versioned unit

use chrono::{DateTime, Utc};
use pond_core::Verdict;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Comparison operator of a rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Operator {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "<" => Some(Operator::Lt),
            ">" => Some(Operator::Gt),
            "<=" => Some(Operator::Le),
            ">=" => Some(Operator::Ge),
            "=" => Some(Operator::Eq),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Eq => "=",
        }
    }

    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Operator::Lt => lhs < rhs,
            Operator::Gt => lhs > rhs,
            Operator::Le => lhs <= rhs,
            Operator::Ge => lhs >= rhs,
            Operator::Eq => lhs == rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A condition over the latest value of one instrument column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    /// Snapshot key, e.g. "Low DO"
    pub param: String,
    /// Case-insensitive substring of the source column header
    pub keyword: String,
    /// Table the value is read from
    pub tab_source: String,
    pub operator: Operator,
    /// Threshold, kept as the raw cell so `=` can fall back to text equality
    pub value: String,
    /// Free-text note from the rules sheet
    #[serde(default)]
    pub logic: String,
}

impl Rule {
    pub fn new(param: &str, keyword: &str, tab_source: &str, operator: Operator, value: &str) -> Self {
        Self {
            param: param.to_string(),
            keyword: keyword.to_string(),
            tab_source: tab_source.to_string(),
            operator,
            value: value.to_string(),
            logic: String::new(),
        }
    }
}

/// Expected outcome of a parameter for one diagnosis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Pass,
    Fail,
    DontCare,
}

impl Expectation {
    /// `PASS`/`FAIL` (any case) are conditions; every other cell is don't-care.
    pub fn parse(cell: &str) -> Self {
        match Verdict::parse(cell) {
            Some(Verdict::Pass) => Expectation::Pass,
            Some(Verdict::Fail) => Expectation::Fail,
            None => Expectation::DontCare,
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Expectation::Pass => Some(Verdict::Pass),
            Expectation::Fail => Some(Verdict::Fail),
            Expectation::DontCare => None,
        }
    }
}

/// One knowledge-base row: a named diagnosis and its PASS/FAIL pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatrixRow {
    /// Diagnosis index from the first column (e.g. "D23"), may be blank
    #[serde(default)]
    pub index: String,
    pub diagnosis: String,
    /// Historical occurrence count, the base rate for the prior
    pub frequency: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    pub expected: BTreeMap<String, Expectation>,
}

impl MatrixRow {
    pub fn new(diagnosis: &str, frequency: f64) -> Self {
        Self {
            index: String::new(),
            diagnosis: diagnosis.to_string(),
            frequency,
            cost: None,
            expected: BTreeMap::new(),
        }
    }

    pub fn expect(mut self, param: &str, expectation: Expectation) -> Self {
        self.expected.insert(param.to_string(), expectation);
        self
    }

    /// Blank names, "-" placeholders and COST marker rows never score.
    pub fn is_eligible_name(name: &str) -> bool {
        let name = name.trim();
        !(name.is_empty() || name == "-" || name.starts_with("COST"))
    }
}

/// The diagnosis knowledge base, eligible rows only, in sheet order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisMatrix {
    /// Parameter columns found in the sheet header, in column order
    pub params: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

impl DiagnosisMatrix {
    pub fn new(rows: Vec<MatrixRow>) -> Self {
        let mut params: Vec<String> = Vec::new();
        for row in &rows {
            for param in row.expected.keys() {
                if !params.contains(param) {
                    params.push(param.clone());
                }
            }
        }
        Self { params, rows }
    }

    /// Sum of all eligible frequencies, the prior's denominator.
    pub fn total_frequency(&self) -> f64 {
        self.rows.iter().map(|r| r.frequency).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rules and matrix as one immutable, versioned unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisConfig {
    pub rules: Vec<Rule>,
    pub matrix: DiagnosisMatrix,
    /// sha256 over rules + matrix
    pub version: String,
    pub loaded_at: DateTime<Utc>,
}

impl DiagnosisConfig {
    pub fn new(rules: Vec<Rule>, matrix: DiagnosisMatrix, loaded_at: DateTime<Utc>) -> Self {
        let version = Self::compute_version(&rules, &matrix);
        Self {
            rules,
            matrix,
            version,
            loaded_at,
        }
    }

    pub fn compute_version(rules: &[Rule], matrix: &DiagnosisMatrix) -> String {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(rules).unwrap_or_default());
        hasher.update(b"|");
        hasher.update(serde_json::to_vec(matrix).unwrap_or_default());
        format!("{:x}", hasher.finalize())
    }

    /// Short fingerprint for log lines.
    pub fn short_version(&self) -> &str {
        &self.version[..self.version.len().min(12)]
    }

    /// Distinct source tables referenced by the rules, in first-seen order.
    pub fn source_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !tables.contains(&rule.tab_source.as_str()) {
                tables.push(rule.tab_source.as_str());
            }
        }
        tables
    }
}
