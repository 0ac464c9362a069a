// validation/store.rs
// Prediction record storage: in-memory and JSONL journal

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::record::PredictionRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Append-or-update storage for prediction records. Records are never deleted.
pub trait PredictionStore: Send + Sync {
    fn insert(&self, record: &PredictionRecord) -> Result<(), StoreError>;

    /// Replace the stored record with the same id.
    fn update(&self, record: &PredictionRecord) -> Result<(), StoreError>;

    fn get(&self, id: Uuid) -> Result<Option<PredictionRecord>, StoreError>;

    /// All records in insertion order.
    fn all(&self) -> Result<Vec<PredictionRecord>, StoreError>;
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryPredictionStore {
    records: RwLock<Vec<PredictionRecord>>,
}

impl InMemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn replace(records: &mut [PredictionRecord], record: &PredictionRecord) {
    if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
        *existing = record.clone();
    }
}

impl PredictionStore for InMemoryPredictionStore {
    fn insert(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .push(record.clone());
        Ok(())
    }

    fn update(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        replace(&mut records, record);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<PredictionRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    fn all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone())
    }
}

// ============================================================================
// JSONL journal
// ============================================================================

/// One journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JournalEvent {
    Logged { record: PredictionRecord },
    Outcome { record: PredictionRecord },
}

/// Append-only JSONL journal. Every insert writes a `logged` line and every
/// update an `outcome` line; opening replays the journal into memory.
pub struct JsonlPredictionStore {
    path: PathBuf,
    records: InMemoryPredictionStore,
    writer: Mutex<File>,
}

impl JsonlPredictionStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let records = InMemoryPredictionStore::new();

        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let mut replayed = 0usize;
            for (i, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<JournalEvent>(&line) {
                    Ok(JournalEvent::Logged { record }) => records.insert(&record)?,
                    Ok(JournalEvent::Outcome { record }) => records.update(&record)?,
                    Err(e) => {
                        warn!(path = %path.display(), line = i + 1, error = %e, "Skipping malformed journal line");
                        continue;
                    }
                }
                replayed += 1;
            }
            info!(path = %path.display(), events = replayed, "Prediction journal replayed");
        }

        let writer = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            records,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &JournalEvent) -> Result<(), StoreError> {
        let line = serde_json::to_string(event)?;
        let mut file = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

impl PredictionStore for JsonlPredictionStore {
    fn insert(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.append(&JournalEvent::Logged {
            record: record.clone(),
        })?;
        self.records.insert(record)
    }

    fn update(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.append(&JournalEvent::Outcome {
            record: record.clone(),
        })?;
        self.records.update(record)
    }

    fn get(&self, id: Uuid) -> Result<Option<PredictionRecord>, StoreError> {
        self.records.get(id)
    }

    fn all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        self.records.all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(label: &str) -> PredictionRecord {
        PredictionRecord::new(Utc::now(), "DO", serde_json::json!({"do": 3.1}), label, 0.9)
    }

    #[test]
    fn test_in_memory_update_by_id() {
        let store = InMemoryPredictionStore::new();
        let mut r = record("LOW");
        store.insert(&r).unwrap();
        store.insert(&record("NORMAL")).unwrap();

        r.apply_outcome("LOW", Utc::now());
        store.update(&r).unwrap();

        assert!(store.get(r.id).unwrap().unwrap().validated);
        assert_eq!(store.all().unwrap().len(), 2);
        assert!(store.get(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_journal_replays_logged_and_outcome() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.jsonl");

        let mut r = record("LOW");
        {
            let store = JsonlPredictionStore::open(&path).unwrap();
            store.insert(&r).unwrap();
            store.insert(&record("CRITICAL")).unwrap();
            r.apply_outcome("critical", Utc::now());
            store.update(&r).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.contains("\"event\":\"logged\""));
        assert!(content.contains("\"event\":\"outcome\""));

        let reopened = JsonlPredictionStore::open(&path).unwrap();
        let all = reopened.all().unwrap();
        assert_eq!(all.len(), 2);
        let replayed = reopened.get(r.id).unwrap().unwrap();
        assert_eq!(replayed.actual_label.as_deref(), Some("CRITICAL"));
        assert_eq!(replayed.is_correct, Some(false));
    }

    #[test]
    fn test_journal_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.jsonl");
        std::fs::write(&path, "not json\n\n").unwrap();

        let store = JsonlPredictionStore::open(&path).unwrap();
        assert!(store.all().unwrap().is_empty());
        store.insert(&record("LOW")).unwrap();
        assert_eq!(JsonlPredictionStore::open(&path).unwrap().all().unwrap().len(), 1);
    }
}
