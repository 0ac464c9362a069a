// trend/readings.rs
// Instrument readings out of a sensor table, plus window selection

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use pond_core::Reading;

use crate::numeric::parse_number;
use crate::rules::resolve_instrument_column;
use crate::source::Table;

/// Timestamp layouts seen in sheets written by devices and by hand.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a sheet timestamp as UTC. First matching format wins, so an
/// ambiguous `01/02/2025` is read day-first.
pub fn parse_timestamp(cell: &str) -> Option<DateTime<Utc>> {
    let cell = cell.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Column keywords for pulling one instrument out of a table.
#[derive(Debug, Clone)]
pub struct ReadingColumns {
    pub timestamp: String,
    pub value: String,
    pub source: String,
}

impl ReadingColumns {
    pub fn new(value_keyword: &str) -> Self {
        Self {
            timestamp: "timestamp".to_string(),
            value: value_keyword.to_string(),
            source: "device".to_string(),
        }
    }

    /// Time-ordered readings. Rows with an unparseable timestamp or a
    /// blank, `-` or non-numeric value are skipped. Headers named exactly
    /// like a keyword win over partial matches. The timestamp column
    /// defaults to the first column when no header matches.
    pub fn extract(&self, table: &Table) -> Vec<Reading> {
        let Some(value_col) = resolve_instrument_column(&table.headers, &self.value) else {
            return Vec::new();
        };
        let ts_col = resolve_instrument_column(&table.headers, &self.timestamp)
            .map(|c| c.index)
            .unwrap_or(0);
        let source_col = resolve_instrument_column(&table.headers, &self.source).map(|c| c.index);

        let mut readings: Vec<Reading> = table
            .rows
            .iter()
            .filter_map(|row| {
                let timestamp = parse_timestamp(row.get(ts_col)?)?;
                let raw = row.get(value_col.index)?.trim();
                if raw == "-" {
                    return None;
                }
                let value = parse_number(raw)?;
                let source = source_col
                    .and_then(|c| row.get(c))
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                Some(Reading::new(timestamp, value, source))
            })
            .collect();

        readings.sort_by_key(|r| r.timestamp);
        readings
    }
}

/// Readings at or after `now - window`. Falls back to the whole history,
/// flagged, when the window is empty.
pub fn select_window(
    history: &[Reading],
    now: DateTime<Utc>,
    window: Duration,
) -> (Vec<Reading>, bool) {
    let cutoff = now - window;
    let recent: Vec<Reading> = history
        .iter()
        .filter(|r| r.timestamp >= cutoff)
        .cloned()
        .collect();

    if recent.is_empty() && !history.is_empty() {
        (history.to_vec(), true)
    } else {
        (recent, false)
    }
}
