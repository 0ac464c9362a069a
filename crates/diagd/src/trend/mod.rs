// trend/mod.rs
// Generic regression-based trend analysis, parameterized per instrument

pub mod acidity;
pub mod classifier;
pub mod oxygen;
pub mod readings;
pub mod regression;

pub use acidity::{AcidityAnalyzer, AcidityFault, AciditySettings, CalibrationStatus, FaultAnalysis};
pub use classifier::{classify, AlertReason, AlertThresholds, Classification};
pub use oxygen::OxygenSettings;
pub use readings::{parse_timestamp, select_window, ReadingColumns};

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pond_core::{AlertLevel, Reading};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;
use crate::numeric::round_to;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendStatus {
    Analyzed,
    NoData,
}

/// Time base of a slope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    PerHour,
    PerDay,
}

impl RateUnit {
    pub fn seconds(&self) -> f64 {
        match self {
            RateUnit::PerHour => regression::SECONDS_PER_HOUR,
            RateUnit::PerDay => regression::SECONDS_PER_DAY,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            RateUnit::PerHour => "hour",
            RateUnit::PerDay => "day",
        }
    }
}

/// Advice appended to each recommendation, by deciding signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendAdvice {
    pub no_data: String,
    pub normal: String,
    pub critical_level: String,
    pub warning_level: String,
    pub critical_rate: String,
    pub warning_rate: String,
}

/// Everything that makes the generic analyzer an oxygen or an acidity analyzer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendProfile {
    /// Display name, e.g. "DO"
    pub instrument: String,
    /// Value unit, e.g. "mg/L"
    pub unit: String,
    pub window_hours: i64,
    pub rate_unit: RateUnit,
    pub slope_decimals: u32,
    pub thresholds: AlertThresholds,
    pub advice: TrendAdvice,
}

impl TrendProfile {
    fn rate_label(&self) -> String {
        format!("{}/{}", self.unit, self.rate_unit.suffix())
    }

    /// Recommendation text for the deciding signal.
    pub fn recommendation(&self, c: &Classification, current: f64, slope: Option<f64>) -> String {
        let drop = slope.map(f64::abs).unwrap_or(0.0);
        match (c.level, c.reason) {
            (AlertLevel::Critical, AlertReason::Rate) => format!(
                "CRITICAL: {} falling fast ({} {}). {}",
                self.instrument,
                drop,
                self.rate_label(),
                self.advice.critical_rate
            ),
            (AlertLevel::Warning, AlertReason::Rate) => format!(
                "{} declining ({} {}). {}",
                self.instrument,
                drop,
                self.rate_label(),
                self.advice.warning_rate
            ),
            (AlertLevel::Critical, _) => format!(
                "CRITICAL: {} very low ({} {}). {}",
                self.instrument, current, self.unit, self.advice.critical_level
            ),
            (AlertLevel::Warning, _) => format!(
                "{} low ({} {}). {}",
                self.instrument, current, self.unit, self.advice.warning_level
            ),
            _ => self.advice.normal.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendResult {
    pub status: TrendStatus,
    pub current_value: Option<f64>,
    /// Rounded OLS slope in `rate_unit`; `None` with fewer than two samples
    pub slope: Option<f64>,
    pub rate_unit: RateUnit,
    pub alert_level: AlertLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<AlertReason>,
    pub recommendation: String,
    pub sample_count: usize,
    /// Window was empty and the whole history was used instead
    pub is_fallback: bool,
    /// Timestamp of the reading behind `current_value`
    pub data_timestamp: Option<DateTime<Utc>>,
    pub window_hours: i64,
}

impl TrendResult {
    pub fn has_data(&self) -> bool {
        self.status == TrendStatus::Analyzed
    }
}

/// Stateless analyzer: window selection, slope, classification.
pub struct TrendAnalyzer {
    profile: TrendProfile,
    clock: Arc<dyn Clock>,
}

impl TrendAnalyzer {
    pub fn new(profile: TrendProfile, clock: Arc<dyn Clock>) -> Self {
        Self { profile, clock }
    }

    pub fn profile(&self) -> &TrendProfile {
        &self.profile
    }

    /// Analyze the configured window of `history` (time-ordered), falling
    /// back to the full history when the window is empty.
    pub fn analyze(&self, history: &[Reading]) -> TrendResult {
        let (window, is_fallback) = select_window(
            history,
            self.clock.now(),
            Duration::hours(self.profile.window_hours),
        );
        if is_fallback {
            debug!(
                instrument = %self.profile.instrument,
                samples = window.len(),
                "No readings in window, using full history"
            );
        }
        self.analyze_window(&window, is_fallback)
    }

    /// Analyze readings already selected by the caller.
    pub fn analyze_window(&self, readings: &[Reading], is_fallback: bool) -> TrendResult {
        let Some(latest) = readings.last() else {
            return TrendResult {
                status: TrendStatus::NoData,
                current_value: None,
                slope: None,
                rate_unit: self.profile.rate_unit,
                alert_level: AlertLevel::Unknown,
                reason: None,
                recommendation: self.profile.advice.no_data.clone(),
                sample_count: 0,
                is_fallback: false,
                data_timestamp: None,
                window_hours: self.profile.window_hours,
            };
        };

        let slope = regression::reading_slope(readings, self.profile.rate_unit.seconds())
            .map(|s| round_to(s, self.profile.slope_decimals));
        let classification = classify(latest.value, slope, &self.profile.thresholds);

        TrendResult {
            status: TrendStatus::Analyzed,
            current_value: Some(latest.value),
            slope,
            rate_unit: self.profile.rate_unit,
            alert_level: classification.level,
            reason: Some(classification.reason),
            recommendation: self
                .profile
                .recommendation(&classification, latest.value, slope),
            sample_count: readings.len(),
            is_fallback,
            data_timestamp: Some(latest.timestamp),
            window_hours: self.profile.window_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn analyzer(now: DateTime<Utc>) -> TrendAnalyzer {
        TrendAnalyzer::new(
            OxygenSettings::default().profile(),
            Arc::new(ManualClock::new(now)),
        )
    }

    #[test]
    fn test_hourly_drop_hits_critical_boundary() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let history = vec![
            Reading::new(t0, 6.0, "ESP_01"),
            Reading::new(t0 + Duration::hours(1), 5.5, "ESP_01"),
            Reading::new(t0 + Duration::hours(2), 5.0, "ESP_01"),
        ];
        let result = analyzer(t0 + Duration::hours(3)).analyze(&history);

        assert_eq!(result.status, TrendStatus::Analyzed);
        assert_eq!(result.slope, Some(-0.5));
        assert_eq!(result.alert_level, AlertLevel::Critical);
        assert_eq!(result.reason, Some(AlertReason::Rate));
        assert!(result.recommendation.contains("falling fast"));
        assert_eq!(result.current_value, Some(5.0));
        assert!(!result.is_fallback);
        assert_eq!(result.sample_count, 3);
    }

    #[test]
    fn test_fallback_uses_latest_historical_reading() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let history = vec![
            Reading::new(t0, 5.0, "ESP_01"),
            Reading::new(t0 + Duration::hours(1), 4.8, "ESP_01"),
        ];
        let result = analyzer(t0 + Duration::days(5)).analyze(&history);
        assert!(result.is_fallback);
        assert_eq!(result.current_value, Some(4.8));
        assert_eq!(result.data_timestamp, Some(t0 + Duration::hours(1)));
    }

    #[test]
    fn test_no_data() {
        let result = analyzer(Utc::now()).analyze(&[]);
        assert_eq!(result.status, TrendStatus::NoData);
        assert_eq!(result.alert_level, AlertLevel::Unknown);
        assert_eq!(result.current_value, None);
        assert!(!result.has_data());
    }

    #[test]
    fn test_single_reading_uses_level_only() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let result = analyzer(t0).analyze(&[Reading::new(t0, 2.9, "+628")]);
        assert_eq!(result.slope, None);
        assert_eq!(result.alert_level, AlertLevel::Critical);
        assert_eq!(result.reason, Some(AlertReason::Level));
        assert!(result.recommendation.contains("very low"));
    }
}
