//! Diagnosis engine: cached config, fresh sensor fetch, evaluation,
//! emergencies and matrix scoring in one call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pond_core::{DataValue, Emergency, ErrorReport, Snapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{ConfigCache, ConfigError, DiagnosisConfig};
use crate::emergency::EmergencyDetector;
use crate::rules::RuleEvaluator;
use crate::scoring::{MatrixScorer, ScoredDiagnosis};
use crate::settings::{DisplaySettings, EngineSettings};
use crate::source::{Table, TabularDataSource};

#[derive(Debug, Error)]
pub enum DiagnosisError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DiagnosisError {
    pub fn report(&self) -> ErrorReport {
        match self {
            DiagnosisError::Config(e) => e.report(),
        }
    }
}

/// One diagnosis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub generated_at: DateTime<Utc>,
    /// Fingerprint of the rules + matrix this run was scored against
    pub config_version: String,
    pub snapshot: Snapshot,
    pub data_values: HashMap<String, DataValue>,
    pub emergencies: Vec<Emergency>,
    /// Sorted by final score, descending
    pub ranked: Vec<ScoredDiagnosis>,
    #[serde(default)]
    pub display: DisplaySettings,
}

impl DiagnosisReport {
    pub fn top(&self) -> Option<&ScoredDiagnosis> {
        self.ranked.first()
    }

    /// Positions 2..=1+limit whose score reaches the display floor.
    pub fn runner_ups(&self) -> Vec<&ScoredDiagnosis> {
        self.ranked
            .iter()
            .skip(1)
            .take(self.display.runner_up_count)
            .filter(|d| d.final_score >= self.display.runner_up_floor)
            .collect()
    }

    /// Params whose rule holds, in rule order.
    pub fn active_conditions(&self) -> Vec<&str> {
        self.snapshot.active()
    }

    pub fn has_emergencies(&self) -> bool {
        !self.emergencies.is_empty()
    }

    /// Fail-closed entries, one report per rule without evidence.
    pub fn missing_data(&self) -> Vec<ErrorReport> {
        self.snapshot
            .entries()
            .iter()
            .filter_map(|e| {
                e.missing.map(|reason| {
                    ErrorReport::new(
                        pond_core::ErrorCode::PartialDataMissing,
                        format!("{}: {}", e.param, reason.as_str()),
                    )
                    .with_subject(&e.param)
                })
            })
            .collect()
    }
}

/// Wires the cache, evaluator, detector and scorer. A blocking call: every
/// run pays one fetch per distinct sensor table plus the pause between them.
pub struct DiagnosisEngine {
    cache: Arc<ConfigCache>,
    source: Arc<dyn TabularDataSource>,
    clock: Arc<dyn Clock>,
    evaluator: RuleEvaluator,
    detector: EmergencyDetector,
    scorer: MatrixScorer,
    fetch_delay: Duration,
    display: DisplaySettings,
}

impl DiagnosisEngine {
    pub fn new(cache: Arc<ConfigCache>, source: Arc<dyn TabularDataSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache,
            source,
            clock,
            evaluator: RuleEvaluator::new(),
            detector: EmergencyDetector::new(),
            scorer: MatrixScorer::new(),
            fetch_delay: Duration::from_millis(crate::settings::DEFAULT_FETCH_DELAY_MS),
            display: DisplaySettings::default(),
        }
    }

    /// Build the cache and engine from settings over one data source.
    pub fn from_settings(
        settings: &EngineSettings,
        source: Arc<dyn TabularDataSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(
            ConfigCache::new(Arc::clone(&source), Arc::clone(&clock))
                .with_loader(settings.config.loader())
                .with_ttl(chrono::Duration::minutes(settings.config.ttl_minutes)),
        );
        Self::new(cache, source, clock)
            .with_detector(EmergencyDetector::with_rules(settings.emergencies.clone()))
            .with_scorer(MatrixScorer::with_config(settings.scoring.clone()))
            .with_fetch_delay(Duration::from_millis(settings.fetch_delay_ms))
            .with_display(settings.display.clone())
    }

    pub fn with_detector(mut self, detector: EmergencyDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_scorer(mut self, scorer: MatrixScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn with_display(mut self, display: DisplaySettings) -> Self {
        self.display = display;
        self
    }

    pub fn cache(&self) -> &Arc<ConfigCache> {
        &self.cache
    }

    /// Full diagnosis. Fails only when the config cannot be loaded; missing
    /// sensor data degrades to fail-closed rule outcomes.
    pub fn run(&self) -> Result<DiagnosisReport, DiagnosisError> {
        let config = self.cache.get_config()?;
        let tables = self.fetch_tables(&config);

        let evaluation = self.evaluator.evaluate(&config.rules, &tables);
        let emergencies = self.detector.detect(&evaluation.snapshot, &evaluation.data_values);
        let ranked = self.scorer.score(&evaluation.snapshot, &config.matrix);

        info!(
            version = %config.short_version(),
            rules = evaluation.snapshot.len(),
            active = evaluation.snapshot.active().len(),
            candidates = ranked.len(),
            emergencies = emergencies.len(),
            top = ranked.first().map(|d| d.diagnosis.as_str()).unwrap_or("-"),
            "Diagnosis complete"
        );

        Ok(DiagnosisReport {
            generated_at: self.clock.now(),
            config_version: config.version.clone(),
            snapshot: evaluation.snapshot,
            data_values: evaluation.data_values,
            emergencies,
            ranked,
            display: self.display.clone(),
        })
    }

    /// Fetch every table the rules reference, first-seen order, pausing
    /// between requests. Never cached.
    fn fetch_tables(&self, config: &DiagnosisConfig) -> HashMap<String, Table> {
        let mut tables = HashMap::new();

        for (i, name) in config.source_tables().into_iter().enumerate() {
            if i > 0 && !self.fetch_delay.is_zero() {
                std::thread::sleep(self.fetch_delay);
            }
            match self.source.get_table(name) {
                Ok(table) => {
                    debug!(table = name, rows = table.rows.len(), "Fetched sensor table");
                    tables.insert(name.to_string(), table);
                }
                Err(e) => {
                    warn!(table = name, error = %e, transient = e.is_transient(), "Cannot read sensor table");
                }
            }
        }

        tables
    }
}
