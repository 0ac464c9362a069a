// trend/oxygen.rs
// Dissolved-oxygen trend profile

use serde::{Deserialize, Serialize};

use super::classifier::AlertThresholds;
use super::{RateUnit, TrendAdvice, TrendProfile};

/// DO drop detection thresholds, mg/L and mg/L per hour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OxygenSettings {
    /// Column keyword in the sensor table
    #[serde(default = "default_keyword")]
    pub keyword: String,
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    #[serde(default = "default_critical_level")]
    pub critical_level: f64,
    #[serde(default = "default_warning_level")]
    pub warning_level: f64,
    #[serde(default = "default_critical_drop_rate")]
    pub critical_drop_rate: f64,
    #[serde(default = "default_warning_drop_rate")]
    pub warning_drop_rate: f64,
}

fn default_keyword() -> String {
    "DO".to_string()
}

fn default_window_hours() -> i64 {
    24
}

fn default_critical_level() -> f64 {
    3.0
}

fn default_warning_level() -> f64 {
    4.0
}

fn default_critical_drop_rate() -> f64 {
    0.5
}

fn default_warning_drop_rate() -> f64 {
    0.3
}

impl Default for OxygenSettings {
    fn default() -> Self {
        Self {
            keyword: default_keyword(),
            window_hours: default_window_hours(),
            critical_level: default_critical_level(),
            warning_level: default_warning_level(),
            critical_drop_rate: default_critical_drop_rate(),
            warning_drop_rate: default_warning_drop_rate(),
        }
    }
}

impl OxygenSettings {
    pub fn profile(&self) -> TrendProfile {
        TrendProfile {
            instrument: "DO".to_string(),
            unit: "mg/L".to_string(),
            window_hours: self.window_hours,
            rate_unit: RateUnit::PerHour,
            slope_decimals: 3,
            thresholds: AlertThresholds {
                critical_level: self.critical_level,
                warning_level: self.warning_level,
                critical_drop_rate: self.critical_drop_rate,
                warning_drop_rate: self.warning_drop_rate,
            },
            advice: TrendAdvice {
                no_data: "No DO data available. Make sure the sensor is connected.".to_string(),
                normal: "DO levels normal.".to_string(),
                critical_level: "Start emergency aeration now!".to_string(),
                warning_level: "Increase aeration.".to_string(),
                critical_rate: "Check aerators and reduce feeding!".to_string(),
                warning_rate: "Monitor closely and prepare extra aeration.".to_string(),
            },
        }
    }
}
