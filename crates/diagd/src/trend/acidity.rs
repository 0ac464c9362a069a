// trend/acidity.rs
// pH sensor fault detection and calibration status

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use pond_core::{Reading, Urgency};
use serde::{Deserialize, Serialize};

use super::classifier::AlertThresholds;
use super::readings::select_window;
use super::regression::{population_variance, reading_slope, SECONDS_PER_DAY};
use super::{RateUnit, TrendAdvice, TrendAnalyzer, TrendProfile, TrendResult};
use crate::clock::Clock;
use crate::numeric::round_to;

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AciditySettings {
    #[serde(default = "default_keyword")]
    pub keyword: String,
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    /// Below this many samples no fault is reported
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_physical_min")]
    pub physical_min: f64,
    #[serde(default = "default_physical_max")]
    pub physical_max: f64,
    /// Variance below this means a stuck sensor
    #[serde(default = "default_stuck_variance")]
    pub stuck_variance: f64,
    /// Variance above this means electrical noise
    #[serde(default = "default_noise_variance")]
    pub noise_variance: f64,
    /// |slope| above this (pH/day) means drift
    #[serde(default = "default_drift_slope")]
    pub drift_slope: f64,
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
    "pH".to_string()
}
fn default_window_hours() -> i64 {
    24
}
fn default_min_samples() -> usize {
    10
}
fn default_physical_min() -> f64 {
    0.0
}
fn default_physical_max() -> f64 {
    14.0
}
fn default_stuck_variance() -> f64 {
    0.01
}
fn default_noise_variance() -> f64 {
    0.5
}
fn default_drift_slope() -> f64 {
    0.1
}
fn default_critical_level() -> f64 {
    6.0
}
fn default_warning_level() -> f64 {
    6.5
}
fn default_critical_drop_rate() -> f64 {
    0.3
}
fn default_warning_drop_rate() -> f64 {
    0.1
}

impl Default for AciditySettings {
    fn default() -> Self {
        Self {
            keyword: default_keyword(),
            window_hours: default_window_hours(),
            min_samples: default_min_samples(),
            physical_min: default_physical_min(),
            physical_max: default_physical_max(),
            stuck_variance: default_stuck_variance(),
            noise_variance: default_noise_variance(),
            drift_slope: default_drift_slope(),
            critical_level: default_critical_level(),
            warning_level: default_warning_level(),
            critical_drop_rate: default_critical_drop_rate(),
            warning_drop_rate: default_warning_drop_rate(),
        }
    }
}

impl AciditySettings {
    pub fn profile(&self) -> TrendProfile {
        TrendProfile {
            instrument: "pH".to_string(),
            unit: "pH".to_string(),
            window_hours: self.window_hours,
            rate_unit: RateUnit::PerDay,
            slope_decimals: 4,
            thresholds: AlertThresholds {
                critical_level: self.critical_level,
                warning_level: self.warning_level,
                critical_drop_rate: self.critical_drop_rate,
                warning_drop_rate: self.warning_drop_rate,
            },
            advice: TrendAdvice {
                no_data: "No pH data available. Make sure the sensor is connected.".to_string(),
                normal: "pH levels normal.".to_string(),
                critical_level: "Add lime or dolomite and stop acid inputs.".to_string(),
                warning_level: "Check alkalinity and plan a lime dose.".to_string(),
                critical_rate: "Verify with a handheld meter, then buffer the water.".to_string(),
                warning_rate: "Recheck tomorrow and verify sensor calibration.".to_string(),
            },
        }
    }
}

// ============================================================================
// Faults
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcidityFault {
    InsufficientData,
    OutOfRange,
    SensorStuck,
    HighNoise,
    DriftUp,
    DriftDown,
    Normal,
}

impl AcidityFault {
    pub const GUIDED: [AcidityFault; 6] = [
        AcidityFault::DriftUp,
        AcidityFault::DriftDown,
        AcidityFault::SensorStuck,
        AcidityFault::HighNoise,
        AcidityFault::OutOfRange,
        AcidityFault::Normal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AcidityFault::InsufficientData => "INSUFFICIENT_DATA",
            AcidityFault::OutOfRange => "OUT_OF_RANGE",
            AcidityFault::SensorStuck => "SENSOR_STUCK",
            AcidityFault::HighNoise => "HIGH_NOISE",
            AcidityFault::DriftUp => "DRIFT_UP",
            AcidityFault::DriftDown => "DRIFT_DOWN",
            AcidityFault::Normal => "NORMAL",
        }
    }

    /// Accepts `drift up`, `Drift_Up`, `DRIFT_UP`.
    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_uppercase().replace(' ', "_");
        [AcidityFault::InsufficientData]
            .into_iter()
            .chain(Self::GUIDED)
            .find(|f| f.as_str() == key)
    }

    pub fn needs_calibration(&self) -> bool {
        !matches!(self, AcidityFault::Normal | AcidityFault::InsufficientData)
    }

    /// Static troubleshooting data. Insufficient data gets the routine-care guide.
    pub fn guide(&self) -> &'static TroubleshootingGuide {
        match self {
            AcidityFault::DriftUp => &DRIFT_UP_GUIDE,
            AcidityFault::DriftDown => &DRIFT_DOWN_GUIDE,
            AcidityFault::SensorStuck => &SENSOR_STUCK_GUIDE,
            AcidityFault::HighNoise => &HIGH_NOISE_GUIDE,
            AcidityFault::OutOfRange => &OUT_OF_RANGE_GUIDE,
            AcidityFault::Normal | AcidityFault::InsufficientData => &NORMAL_GUIDE,
        }
    }
}

impl fmt::Display for AcidityFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TroubleshootingGuide {
    pub symptom: &'static str,
    pub causes: &'static [&'static str],
    pub steps: &'static [&'static str],
    pub urgency: Urgency,
}

static DRIFT_UP_GUIDE: TroubleshootingGuide = TroubleshootingGuide {
    symptom: "pH reading drifts upward gradually",
    causes: &[
        "Electrode aging (reference junction drying)",
        "Buildup on electrode surface",
        "Reference electrolyte depleting",
    ],
    steps: &[
        "1. Clean the probe with a soft brush and distilled water",
        "2. Soak the probe in 3M KCl for 2-4 hours",
        "3. Recalibrate with pH 7.0 and pH 4.0 buffers",
        "4. If drift persists, replace the reference electrode",
    ],
    urgency: Urgency::Medium,
};

static DRIFT_DOWN_GUIDE: TroubleshootingGuide = TroubleshootingGuide {
    symptom: "pH reading drifts downward gradually",
    causes: &[
        "Reference junction clogged",
        "Contamination on glass membrane",
        "Temperature compensation error",
    ],
    steps: &[
        "1. Soak the probe in warm water (40C) for 30 minutes",
        "2. Clean with 0.1M HCl for 5-10 minutes",
        "3. Rinse with distilled water",
        "4. Recalibrate with pH 7.0 and pH 10.0 buffers",
    ],
    urgency: Urgency::Medium,
};

static SENSOR_STUCK_GUIDE: TroubleshootingGuide = TroubleshootingGuide {
    symptom: "pH reading does not change (stuck)",
    causes: &[
        "Electrode broken or cracked",
        "Cable disconnected or damaged",
        "ADC module failure",
    ],
    steps: &[
        "1. Check the cable from the sensor to the controller board",
        "2. Check that the probe is submerged",
        "3. Measure a pH 7.0 buffer, expect 7.0 +/- 0.2",
        "4. If the reading still does not move, replace the probe",
    ],
    urgency: Urgency::High,
};

static HIGH_NOISE_GUIDE: TroubleshootingGuide = TroubleshootingGuide {
    symptom: "pH reading fluctuates heavily",
    causes: &[
        "Electrical interference (grounding issue)",
        "Damaged cable shielding",
        "Moisture in connector",
    ],
    steps: &[
        "1. Check probe grounding",
        "2. Route the sensor cable away from motors and inverters",
        "3. Check the connector for water or moisture",
        "4. Use shielded cable",
    ],
    urgency: Urgency::Medium,
};

static OUT_OF_RANGE_GUIDE: TroubleshootingGuide = TroubleshootingGuide {
    symptom: "pH reading outside the physical range (< 0 or > 14)",
    causes: &[
        "Sensor completely broken",
        "ADC calibration error",
        "Wrong sensor connected",
    ],
    steps: &[
        "1. Confirm the connected sensor is a pH sensor",
        "2. Check ADC wiring for reversed leads",
        "3. Reset the ADC module / controller board",
        "4. Replace the sensor if the error persists",
    ],
    urgency: Urgency::High,
};

static NORMAL_GUIDE: TroubleshootingGuide = TroubleshootingGuide {
    symptom: "Sensor working normally",
    causes: &[],
    steps: &[
        "Calibrate routinely every 2 weeks",
        "Store the probe in 3M KCl when not in use",
        "Avoid leaving the probe exposed to air",
    ],
    urgency: Urgency::Low,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FaultAnalysis {
    pub fault: AcidityFault,
    /// pH/day, 4 decimals
    pub slope: Option<f64>,
    /// Population variance, 4 decimals
    pub variance: Option<f64>,
    pub current_value: Option<f64>,
    pub sample_count: usize,
    pub message: String,
}

/// Fault decision order: sample count, physical range, stuck, noise,
/// drift direction, normal. First hit wins.
pub fn detect_fault(readings: &[Reading], settings: &AciditySettings) -> FaultAnalysis {
    let sample_count = readings.len();
    let mut analysis = FaultAnalysis {
        fault: AcidityFault::InsufficientData,
        slope: None,
        variance: None,
        current_value: readings.last().map(|r| r.value),
        sample_count,
        message: format!(
            "Not enough data (need at least {} samples, have {})",
            settings.min_samples, sample_count
        ),
    };

    if sample_count < settings.min_samples {
        return analysis;
    }

    if readings
        .iter()
        .any(|r| r.value < settings.physical_min || r.value > settings.physical_max)
    {
        analysis.fault = AcidityFault::OutOfRange;
        analysis.message = format!(
            "Reading outside the physical pH range ({}-{})",
            settings.physical_min, settings.physical_max
        );
        return analysis;
    }

    let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
    let slope = reading_slope(readings, SECONDS_PER_DAY).map(|s| round_to(s, 4)).unwrap_or(0.0);
    let variance = round_to(population_variance(&values), 4);
    analysis.slope = Some(slope);
    analysis.variance = Some(variance);

    (analysis.fault, analysis.message) = if variance < settings.stuck_variance {
        (
            AcidityFault::SensorStuck,
            format!("Sensor may be stuck, variance very low: {}", variance),
        )
    } else if variance > settings.noise_variance {
        (
            AcidityFault::HighNoise,
            format!("High noise detected, variance: {}", variance),
        )
    } else if slope.abs() > settings.drift_slope {
        let fault = if slope > 0.0 {
            AcidityFault::DriftUp
        } else {
            AcidityFault::DriftDown
        };
        (fault, format!("Drift detected: {} pH/day", slope))
    } else {
        (AcidityFault::Normal, "Sensor working normally".to_string())
    };

    analysis
}

// ============================================================================
// Analyzer
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalibrationStatus {
    pub needs_calibration: bool,
    pub analysis: FaultAnalysis,
    pub guide: &'static TroubleshootingGuide,
    pub trend: TrendResult,
}

/// pH analyzer: the generic trend plus sensor fault detection over the same window.
pub struct AcidityAnalyzer {
    settings: AciditySettings,
    trend: TrendAnalyzer,
    clock: Arc<dyn Clock>,
}

impl AcidityAnalyzer {
    pub fn new(settings: AciditySettings, clock: Arc<dyn Clock>) -> Self {
        let trend = TrendAnalyzer::new(settings.profile(), Arc::clone(&clock));
        Self {
            settings,
            trend,
            clock,
        }
    }

    pub fn settings(&self) -> &AciditySettings {
        &self.settings
    }

    pub fn calibration_status(&self, history: &[Reading]) -> CalibrationStatus {
        let (window, is_fallback) = select_window(
            history,
            self.clock.now(),
            Duration::hours(self.settings.window_hours),
        );
        let analysis = detect_fault(&window, &self.settings);
        let trend = self.trend.analyze_window(&window, is_fallback);

        CalibrationStatus {
            needs_calibration: analysis.fault.needs_calibration(),
            guide: analysis.fault.guide(),
            analysis,
            trend,
        }
    }
}
