//! Tabular data source: the read-only view of the spreadsheet backend.
//!
//! Every cell is a string. Numeric and locale normalization happens in the
//! consumers, never here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;

/// Data source errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Table not found: {0}")]
    NotFound(String),

    #[error("Data source unavailable: {0}")]
    Unavailable(String),

    #[error("Data source timed out after {0:?}")]
    Timeout(Duration),

    #[error("Data source request quota exceeded")]
    QuotaExceeded,
}

impl SourceError {
    /// Transient failures are worth a retry by the caller; the others are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Timeout(_) | SourceError::QuotaExceeded | SourceError::Unavailable(_)
        )
    }
}

/// A named table: one header row plus data rows, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Split raw sheet values (first row = headers) into a table.
    pub fn from_values(mut values: Vec<Vec<String>>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let headers = values.remove(0);
        Self {
            headers,
            rows: values,
        }
    }

    /// Convenience constructor for literal tables.
    pub fn from_strs(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    /// A table with no header row carries no addressable columns.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Cell at (row, col), if the row is long enough.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(|c| c.as_str())
    }
}

/// Read-only access to named tables.
pub trait TabularDataSource: Send + Sync {
    fn get_table(&self, name: &str) -> Result<Table, SourceError>;

    fn get_worksheet_names(&self) -> Result<Vec<String>, SourceError>;
}

/// In-memory data source for tests, demos and replay.
///
/// Tables can be swapped at runtime and individual tables can be made to
/// fail, which is how outage and timeout paths are exercised.
pub struct InMemorySource {
    tables: RwLock<BTreeMap<String, Table>>,
    failing: RwLock<BTreeMap<String, SourceError>>,
    offline: RwLock<Option<SourceError>>,
    fetches: AtomicU64,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            failing: RwLock::new(BTreeMap::new()),
            offline: RwLock::new(None),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn with_table(self, name: &str, table: Table) -> Self {
        self.set_table(name, table);
        self
    }

    pub fn set_table(&self, name: &str, table: Table) {
        if let Ok(mut tables) = self.tables.write() {
            tables.insert(name.to_string(), table);
        }
    }

    /// Make every subsequent fetch of `name` fail with `error`.
    pub fn fail_table(&self, name: &str, error: SourceError) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(name.to_string(), error);
        }
    }

    pub fn heal_table(&self, name: &str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.remove(name);
        }
    }

    /// Take the whole source offline (`Some`) or back online (`None`).
    pub fn set_offline(&self, error: Option<SourceError>) {
        if let Ok(mut offline) = self.offline.write() {
            *offline = error;
        }
    }

    /// Number of `get_table` calls served so far, including failed ones.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularDataSource for InMemorySource {
    fn get_table(&self, name: &str) -> Result<Table, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.offline.read().ok().and_then(|o| o.clone()) {
            return Err(err);
        }
        if let Some(err) = self.failing.read().ok().and_then(|f| f.get(name).cloned()) {
            return Err(err);
        }

        self.tables
            .read()
            .map_err(|_| SourceError::Unavailable("table lock poisoned".to_string()))?
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(name.to_string()))
    }

    fn get_worksheet_names(&self) -> Result<Vec<String>, SourceError> {
        if let Some(err) = self.offline.read().ok().and_then(|o| o.clone()) {
            return Err(err);
        }
        Ok(self
            .tables
            .read()
            .map_err(|_| SourceError::Unavailable("table lock poisoned".to_string()))?
            .keys()
            .cloned()
            .collect())
    }
}

/// File-backed workbook: a JSON or YAML document mapping table name to raw
/// sheet values (first row = headers).
///
/// ```yaml
/// tables:
///   Water Quality:
///     - [Timestamp, Phone, Device, DO, Temp, pH]
///     - ["2025-01-01 06:00:00", "", ESP_01, "5,8", "28", "7.4"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkbookFile {
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<Vec<String>>>,
}

impl WorkbookFile {
    /// Load from a `.json`, `.yaml` or `.yml` file (by extension).
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SourceError::Unavailable(format!("Failed to read workbook {}: {}", path.display(), e))
        })?;

        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");

        let parsed = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|e| {
            SourceError::Unavailable(format!("Failed to parse workbook {}: {}", path.display(), e))
        })
    }
}

impl TabularDataSource for WorkbookFile {
    fn get_table(&self, name: &str) -> Result<Table, SourceError> {
        self.tables
            .get(name)
            .map(|values| Table::from_values(values.clone()))
            .ok_or_else(|| SourceError::NotFound(name.to_string()))
    }

    fn get_worksheet_names(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.tables.keys().cloned().collect())
    }
}
