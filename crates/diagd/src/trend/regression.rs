// trend/regression.rs
// Least-squares slope and population variance over readings

use chrono::{DateTime, Utc};
use pond_core::Reading;

/// Seconds per slope unit.
pub const SECONDS_PER_HOUR: f64 = 3600.0;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// OLS slope of `y` over `x`.
///
/// `None` with fewer than two points; `0.0` when all `x` coincide.
pub fn ols_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for &(x, y) in points {
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }
    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return Some(0.0);
    }
    Some((n * sum_xy - sum_x * sum_y) / denominator)
}

/// Slope of reading values against elapsed time since the first reading,
/// in value units per `unit_seconds`. Readings must be time-ordered.
pub fn reading_slope(readings: &[Reading], unit_seconds: f64) -> Option<f64> {
    let t0 = readings.first()?.timestamp;
    let points: Vec<(f64, f64)> = readings
        .iter()
        .map(|r| (elapsed(t0, r.timestamp) / unit_seconds, r.value))
        .collect();
    ols_slope(&points)
}

/// Population variance (divides by n). Zero with fewer than two values.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

fn elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}
