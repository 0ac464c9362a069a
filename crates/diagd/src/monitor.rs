// monitor.rs
// Auto-diagnosis on incoming data: event log + emergency notifications

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use pond_core::Reading;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::DiagnosisReport;
use crate::integrations::NotificationSink;
use crate::settings::MonitorSettings;
use crate::validation::StoreError;

/// One logged auto-diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisEvent {
    pub timestamp: DateTime<Utc>,
    pub diagnosis: String,
    /// PASS params at the time of the diagnosis
    pub triggers: Vec<String>,
    pub note: String,
}

pub trait EventLog: Send + Sync {
    fn append(&self, event: &DiagnosisEvent) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<DiagnosisEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosisEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventLog for MemoryEventLog {
    fn append(&self, event: &DiagnosisEvent) -> Result<(), StoreError> {
        self.events
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .push(event.clone());
        Ok(())
    }
}

/// Append-only JSONL event log
pub struct JsonlEventLog {
    path: PathBuf,
    writer: Mutex<File>,
}

impl JsonlEventLog {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let writer = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventLog for JsonlEventLog {
    fn append(&self, event: &DiagnosisEvent) -> Result<(), StoreError> {
        let line = serde_json::to_string(event)?;
        let mut file = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

/// What `observe` did with a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// A new diagnosis event was written
    pub logged: bool,
    /// Emergencies were handed to the sink
    pub notified: bool,
}

/// Watches successive diagnosis reports. Logs a diagnosis only when it is
/// confident and differs from the last one logged; emergencies are always
/// forwarded.
pub struct AutoDiagnosisMonitor {
    log: Arc<dyn EventLog>,
    sink: Arc<dyn NotificationSink>,
    settings: MonitorSettings,
    last_diagnosis: Mutex<Option<String>>,
}

impl AutoDiagnosisMonitor {
    pub fn new(
        log: Arc<dyn EventLog>,
        sink: Arc<dyn NotificationSink>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            log,
            sink,
            settings,
            last_diagnosis: Mutex::new(None),
        }
    }

    /// Event log from `settings.event_log_path`, in memory when unset.
    pub fn from_settings(
        settings: MonitorSettings,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, StoreError> {
        let log: Arc<dyn EventLog> = match &settings.event_log_path {
            Some(path) => {
                info!(path = %path.display(), "Diagnosis events written to JSONL");
                Arc::new(JsonlEventLog::open(path)?)
            }
            None => Arc::new(MemoryEventLog::new()),
        };
        Ok(Self::new(log, sink, settings))
    }

    pub fn last_diagnosis(&self) -> Option<String> {
        self.last_diagnosis.lock().ok().and_then(|l| l.clone())
    }

    pub fn observe(&self, report: &DiagnosisReport) -> Observation {
        let notified = self.notify_emergencies(report);
        let logged = self.log_diagnosis(report);
        Observation { logged, notified }
    }

    /// `observe` for a report triggered by a new sensor row. Rows typed in
    /// by hand are still logged but never notified.
    pub fn observe_reading(&self, latest: &Reading, report: &DiagnosisReport) -> Observation {
        if !latest.is_manual_entry() {
            return self.observe(report);
        }
        debug!(source = %latest.source_id, "Manual entry, notification skipped");
        Observation {
            logged: self.log_diagnosis(report),
            notified: false,
        }
    }

    fn log_diagnosis(&self, report: &DiagnosisReport) -> bool {
        let Some(top) = report.top() else {
            debug!("Auto-diagnosis: no candidate");
            return false;
        };
        if top.confidence() < self.settings.min_confidence {
            debug!(diagnosis = %top.diagnosis, confidence = top.confidence(), "Auto-diagnosis below threshold");
            return false;
        }

        let Ok(mut last) = self.last_diagnosis.lock() else {
            warn!("Auto-diagnosis state lock poisoned");
            return false;
        };
        if last.as_deref() == Some(top.diagnosis.as_str()) {
            debug!(diagnosis = %top.diagnosis, "Auto-diagnosis unchanged");
            return false;
        }

        let event = DiagnosisEvent {
            timestamp: report.generated_at,
            diagnosis: top.diagnosis.clone(),
            triggers: report
                .active_conditions()
                .into_iter()
                .map(str::to_string)
                .collect(),
            note: format!(
                "Auto-diagnosis ({}%): {}/{} conditions matched",
                top.confidence(),
                top.matched,
                top.total
            ),
        };

        match self.log.append(&event) {
            Ok(()) => {
                info!(diagnosis = %event.diagnosis, confidence = top.confidence(), "Auto-diagnosis logged");
                *last = Some(event.diagnosis);
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to write diagnosis event");
                false
            }
        }
    }

    fn notify_emergencies(&self, report: &DiagnosisReport) -> bool {
        if !report.has_emergencies() || self.settings.recipients.is_empty() {
            return false;
        }

        let text = report
            .emergencies
            .iter()
            .map(|e| format!("{}\n{}\n{}", e.title, e.detail, e.action))
            .collect::<Vec<_>>()
            .join("\n\n");

        match self.sink.send(&text, &self.settings.recipients) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, recipients = self.settings.recipients.len(), "Emergency notification failed");
                false
            }
        }
    }
}
