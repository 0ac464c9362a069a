use serde::{Deserialize, Serialize};

use super::Verdict;

/// Why a rule had no evidence to evaluate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    TableUnavailable,
    ColumnNotFound,
    NoValue,
}

impl MissingReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingReason::TableUnavailable => "table unavailable",
            MissingReason::ColumnNotFound => "column not found",
            MissingReason::NoValue => "no value",
        }
    }
}

/// One rule's outcome inside a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub param: String,
    pub verdict: Verdict,
    /// Set when the verdict is a fail-closed default rather than an observation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<MissingReason>,
}

/// Per-evaluation mapping of rule param → PASS/FAIL, in rule order.
///
/// Rule sets are small (tens of params), so lookups are linear scans over
/// the ordered entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed verdict. A repeated param replaces the earlier entry in place.
    pub fn record(&mut self, param: &str, verdict: Verdict) {
        self.upsert(SnapshotEntry {
            param: param.to_string(),
            verdict,
            missing: None,
        });
    }

    /// Record a fail-closed entry for a rule whose evidence could not be read.
    pub fn record_missing(&mut self, param: &str, reason: MissingReason) {
        self.upsert(SnapshotEntry {
            param: param.to_string(),
            verdict: Verdict::Fail,
            missing: Some(reason),
        });
    }

    fn upsert(&mut self, entry: SnapshotEntry) {
        match self.entries.iter_mut().find(|e| e.param == entry.param) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, param: &str) -> Option<Verdict> {
        self.entry(param).map(|e| e.verdict)
    }

    pub fn entry(&self, param: &str) -> Option<&SnapshotEntry> {
        self.entries.iter().find(|e| e.param == param)
    }

    pub fn contains(&self, param: &str) -> bool {
        self.entry(param).is_some()
    }

    pub fn is_missing(&self, param: &str) -> bool {
        self.entry(param).is_some_and(|e| e.missing.is_some())
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Params whose rule currently holds, in rule order.
    pub fn active(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.verdict.is_pass())
            .map(|e| e.param.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The literal evidence behind a snapshot entry, kept for display and audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataValue {
    pub value: String,
    pub column: String,
    pub tab: String,
}
