// trend/classifier.rs
// Dual-signal alert classification: absolute level and rate of decline

use pond_core::AlertLevel;
use serde::{Deserialize, Serialize};

/// Floors and drop rates for one instrument. Rates are magnitudes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlertThresholds {
    pub critical_level: f64,
    pub warning_level: f64,
    pub critical_drop_rate: f64,
    pub warning_drop_rate: f64,
}

/// Which signal decided the final severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertReason {
    Level,
    Rate,
    Normal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    pub level: AlertLevel,
    pub reason: AlertReason,
    pub level_signal: AlertLevel,
    pub rate_signal: AlertLevel,
}

/// Severity of the absolute value. At or below a floor triggers it.
pub fn level_signal(current: f64, t: &AlertThresholds) -> AlertLevel {
    if current <= t.critical_level {
        AlertLevel::Critical
    } else if current <= t.warning_level {
        AlertLevel::Warning
    } else {
        AlertLevel::Normal
    }
}

/// Severity of a declining slope. Rising or flat slopes never fire; a drop
/// exactly at a threshold does.
pub fn rate_signal(slope: Option<f64>, t: &AlertThresholds) -> AlertLevel {
    match slope {
        Some(s) if s < 0.0 && s.abs() >= t.critical_drop_rate => AlertLevel::Critical,
        Some(s) if s < 0.0 && s.abs() >= t.warning_drop_rate => AlertLevel::Warning,
        _ => AlertLevel::Normal,
    }
}

/// Take the worse of both signals. The rate signal is the reason whenever
/// it reaches the final severity.
///
/// | level    | rate     | result   | reason |
/// |----------|----------|----------|--------|
/// | NORMAL   | NORMAL   | NORMAL   | normal |
/// | WARNING  | NORMAL   | WARNING  | level  |
/// | any      | = final  | final    | rate   |
/// | CRITICAL | WARNING  | CRITICAL | level  |
pub fn classify(current: f64, slope: Option<f64>, t: &AlertThresholds) -> Classification {
    let level_signal = level_signal(current, t);
    let rate_signal = rate_signal(slope, t);
    let level = level_signal.max(rate_signal);

    let reason = if level == AlertLevel::Normal {
        AlertReason::Normal
    } else if rate_signal == level {
        AlertReason::Rate
    } else {
        AlertReason::Level
    };

    Classification {
        level,
        reason,
        level_signal,
        rate_signal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DO: AlertThresholds = AlertThresholds {
        critical_level: 3.0,
        warning_level: 4.0,
        critical_drop_rate: 0.5,
        warning_drop_rate: 0.3,
    };

    #[test]
    fn test_rate_boundary_is_inclusive() {
        let c = classify(5.0, Some(-0.5), &DO);
        assert_eq!(c.level, AlertLevel::Critical);
        assert_eq!(c.reason, AlertReason::Rate);
        assert_eq!(c.level_signal, AlertLevel::Normal);

        assert_eq!(classify(5.0, Some(-0.3), &DO).level, AlertLevel::Warning);
        assert_eq!(classify(5.0, Some(-0.299), &DO).level, AlertLevel::Normal);
    }

    #[test]
    fn test_rising_slope_never_fires() {
        assert_eq!(rate_signal(Some(2.0), &DO), AlertLevel::Normal);
        assert_eq!(rate_signal(None, &DO), AlertLevel::Normal);
    }

    #[test]
    fn test_decision_table() {
        let c = classify(3.8, None, &DO);
        assert_eq!((c.level, c.reason), (AlertLevel::Warning, AlertReason::Level));

        let c = classify(3.8, Some(-0.35), &DO);
        assert_eq!((c.level, c.reason), (AlertLevel::Warning, AlertReason::Rate));

        let c = classify(2.5, Some(-0.35), &DO);
        assert_eq!((c.level, c.reason), (AlertLevel::Critical, AlertReason::Level));

        let c = classify(2.5, Some(-0.6), &DO);
        assert_eq!((c.level, c.reason), (AlertLevel::Critical, AlertReason::Rate));

        let c = classify(6.0, Some(0.1), &DO);
        assert_eq!((c.level, c.reason), (AlertLevel::Normal, AlertReason::Normal));
    }
}
