//! Engine settings
//!
//! YAML/JSON configuration for table names, cache TTL, scoring weights,
//! trend thresholds, the reference pond and the emergency watch list.
//! Every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::aeration::PondSettings;
use crate::config::cache::DEFAULT_TTL_MINUTES;
use crate::config::loader::{DEFAULT_MATRIX_TABLE, DEFAULT_RULES_TABLE};
use crate::config::ConfigLoader;
use crate::emergency::{default_emergency_rules, EmergencyRule};
use crate::scoring::ScorerConfig;
use crate::trend::{AciditySettings, OxygenSettings};
use crate::validation::tracker::DEFAULT_MIN_VALIDATED;

/// Pause between consecutive sensor-table fetches
pub const DEFAULT_FETCH_DELAY_MS: u64 = 300;
pub const DEFAULT_SENSOR_TABLE: &str = "Water Quality";
/// One year
pub const MAX_TTL_MINUTES: i64 = 525_600;
pub const MAX_WINDOW_HOURS: i64 = 8_760;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid settings {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Top-level engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub config: ConfigSettings,

    /// Pause between sensor-table requests (milliseconds)
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,

    /// Table holding timestamped DO/pH readings for trend analysis
    #[serde(default = "default_sensor_table")]
    pub sensor_table: String,

    #[serde(default)]
    pub scoring: ScorerConfig,

    #[serde(default)]
    pub display: DisplaySettings,

    #[serde(default)]
    pub oxygen: OxygenSettings,

    #[serde(default)]
    pub acidity: AciditySettings,

    #[serde(default)]
    pub pond: PondSettings,

    #[serde(default = "default_emergencies")]
    pub emergencies: Vec<EmergencyRule>,

    #[serde(default)]
    pub validation: ValidationSettings,

    #[serde(default)]
    pub monitor: MonitorSettings,
}

fn default_fetch_delay_ms() -> u64 {
    DEFAULT_FETCH_DELAY_MS
}

fn default_sensor_table() -> String {
    DEFAULT_SENSOR_TABLE.to_string()
}

fn default_emergencies() -> Vec<EmergencyRule> {
    default_emergency_rules()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            config: ConfigSettings::default(),
            fetch_delay_ms: default_fetch_delay_ms(),
            sensor_table: default_sensor_table(),
            scoring: ScorerConfig::default(),
            display: DisplaySettings::default(),
            oxygen: OxygenSettings::default(),
            acidity: AciditySettings::default(),
            pond: PondSettings::default(),
            emergencies: default_emergencies(),
            validation: ValidationSettings::default(),
            monitor: MonitorSettings::default(),
        }
    }
}

impl EngineSettings {
    /// Load from YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self, SettingsError> {
        let content = read(path)?;
        let settings: Self = serde_yaml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        settings.checked(path)
    }

    /// Load from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, SettingsError> {
        let content = read(path)?;
        let settings: Self = serde_json::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        settings.checked(path)
    }

    /// Range checks for values that would otherwise skew scores or
    /// overflow time arithmetic.
    pub fn validate(&self) -> Result<(), String> {
        self.scoring.validate()?;
        if !(0..=MAX_TTL_MINUTES).contains(&self.config.ttl_minutes) {
            return Err(format!(
                "config.ttl_minutes must be within 0..={}, got {}",
                MAX_TTL_MINUTES, self.config.ttl_minutes
            ));
        }
        for (name, hours) in [
            ("oxygen.window_hours", self.oxygen.window_hours),
            ("acidity.window_hours", self.acidity.window_hours),
        ] {
            if !(1..=MAX_WINDOW_HOURS).contains(&hours) {
                return Err(format!(
                    "{} must be within 1..={}, got {}",
                    name, MAX_WINDOW_HOURS, hours
                ));
            }
        }
        Ok(())
    }

    fn checked(self, path: &Path) -> Result<Self, SettingsError> {
        self.validate().map_err(|message| SettingsError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(self)
    }

    /// `.yaml`/`.yml` as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if is_yaml {
            Self::from_yaml_file(path)
        } else {
            Self::from_json_file(path)
        }
    }
}

fn read(path: &Path) -> Result<String, SettingsError> {
    std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Config tables and cache lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSettings {
    #[serde(default = "default_rules_table")]
    pub rules_table: String,

    #[serde(default = "default_matrix_table")]
    pub matrix_table: String,

    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

fn default_rules_table() -> String {
    DEFAULT_RULES_TABLE.to_string()
}

fn default_matrix_table() -> String {
    DEFAULT_MATRIX_TABLE.to_string()
}

fn default_ttl_minutes() -> i64 {
    DEFAULT_TTL_MINUTES
}

impl Default for ConfigSettings {
    fn default() -> Self {
        Self {
            rules_table: default_rules_table(),
            matrix_table: default_matrix_table(),
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

impl ConfigSettings {
    pub fn loader(&self) -> ConfigLoader {
        ConfigLoader::new(&self.rules_table, &self.matrix_table)
    }
}

/// How much of the ranking is shown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplaySettings {
    /// Runner-ups scoring below this are hidden
    #[serde(default = "default_runner_up_floor")]
    pub runner_up_floor: f64,

    #[serde(default = "default_runner_up_count")]
    pub runner_up_count: usize,
}

fn default_runner_up_floor() -> f64 {
    40.0
}

fn default_runner_up_count() -> usize {
    4
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            runner_up_floor: default_runner_up_floor(),
            runner_up_count: default_runner_up_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSettings {
    #[serde(default = "default_min_validated")]
    pub min_validated: usize,

    /// JSONL prediction journal; in-memory when unset
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

fn default_min_validated() -> usize {
    DEFAULT_MIN_VALIDATED
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_validated: default_min_validated(),
            store_path: None,
        }
    }
}

/// Automatic diagnosis on incoming data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Notification recipients for emergencies
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Confidence below which a top diagnosis is not logged
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u32,

    /// JSONL event log; in-memory when unset
    #[serde(default)]
    pub event_log_path: Option<PathBuf>,
}

fn default_min_confidence() -> u32 {
    40
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            recipients: Vec::new(),
            min_confidence: default_min_confidence(),
            event_log_path: None,
        }
    }
}
