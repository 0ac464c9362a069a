//! Pond health decision support
//!
//! Rule evaluation over live sensor tables, matrix-based differential
//! diagnosis, emergency overrides, DO/pH trend analysis, aeration sizing and
//! prediction validation.
//!
//! ## Architecture
//!
//! ```text
//!  ┌───────────────────────────────────────────────────────────────┐
//!  │                        DiagnosisEngine                        │
//!  │                                                               │
//!  │  ┌─────────────┐   ┌───────────────┐   ┌──────────────────┐   │
//!  │  │ ConfigCache │──▶│ RuleEvaluator │──▶│ EmergencyDetector│   │
//!  │  │ (TTL, swap) │   │  (snapshot)   │   │  MatrixScorer    │   │
//!  │  └──────┬──────┘   └───────┬───────┘   └────────┬─────────┘   │
//!  │         │                  │                    ▼             │
//!  │         ▼                  ▼             DiagnosisReport      │
//!  │  ┌──────────────────────────────┐               │             │
//!  │  │       TabularDataSource      │               ▼             │
//!  │  └──────────────────────────────┘    report / monitor /       │
//!  │                                      explanation / sinks      │
//!  └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use pond_diagd::{DiagnosisEngine, EngineSettings, SystemClock, WorkbookFile};
//! use std::sync::Arc;
//!
//! let source = Arc::new(WorkbookFile::load(path)?);
//! let engine = DiagnosisEngine::from_settings(&EngineSettings::default(), source, Arc::new(SystemClock));
//! let report = engine.run()?;
//! println!("{}", pond_diagd::report::render_summary(&report));
//! ```

pub mod aeration;
pub mod clock;
pub mod config;
pub mod emergency;
pub mod engine;
pub mod integrations;
pub mod monitor;
pub mod numeric;
pub mod report;
pub mod rules;
pub mod scoring;
pub mod settings;
pub mod source;
pub mod trend;
pub mod validation;

pub use aeration::{oxygen_demand, AerationAdvisor, AerationDemand, AerationRecommendation, PondSettings};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigCache, ConfigError, ConfigLoader, DiagnosisConfig};
pub use emergency::{EmergencyDetector, EmergencyRule};
pub use engine::{DiagnosisEngine, DiagnosisError, DiagnosisReport};
pub use integrations::{explain_best_effort, ExplanationService, LogSink, MemorySink, NotificationSink};
pub use monitor::{AutoDiagnosisMonitor, DiagnosisEvent, EventLog, JsonlEventLog, MemoryEventLog};
pub use rules::RuleEvaluator;
pub use scoring::{MatrixScorer, MissingDataPolicy, ScoredDiagnosis};
pub use settings::{EngineSettings, SettingsError};
pub use source::{InMemorySource, SourceError, Table, TabularDataSource, WorkbookFile};
pub use trend::{AcidityAnalyzer, AcidityFault, OxygenSettings, TrendAnalyzer, TrendResult};
pub use validation::{ConfusionReport, JsonlPredictionStore, PredictionStore, ValidationTracker};
