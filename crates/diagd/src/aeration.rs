//! Aeration demand sizing from the current oxygen level.

use std::sync::Arc;

use pond_core::{AlertLevel, Reading};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Clock;
use crate::numeric::round_to;
use crate::trend::{OxygenSettings, TrendAnalyzer, TrendResult};

/// kg O2 per kg of fish per hour
pub const RESPIRATION_RATE: f64 = 0.0003;
/// kg O2 per HP per hour, paddle-wheel aerator
pub const AERATOR_TRANSFER_RATE: f64 = 0.5;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AerationError {
    #[error("Invalid {field}: {value} (must be a finite, non-negative number)")]
    InvalidInput { field: &'static str, value: f64 },
}

/// Reference pond the recommendation is sized for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PondSettings {
    #[serde(default = "default_volume_m3")]
    pub volume_m3: f64,
    #[serde(default = "default_fish_count")]
    pub fish_count: u64,
    #[serde(default = "default_target_do")]
    pub target_do: f64,
    #[serde(default = "default_avg_weight_g")]
    pub avg_weight_g: f64,
    #[serde(default = "default_safety_factor")]
    pub safety_factor: f64,
}

fn default_volume_m3() -> f64 {
    1000.0
}

fn default_fish_count() -> u64 {
    8000
}

fn default_target_do() -> f64 {
    6.0
}

fn default_avg_weight_g() -> f64 {
    100.0
}

fn default_safety_factor() -> f64 {
    1.2
}

impl Default for PondSettings {
    fn default() -> Self {
        Self {
            volume_m3: default_volume_m3(),
            fish_count: default_fish_count(),
            target_do: default_target_do(),
            avg_weight_g: default_avg_weight_g(),
            safety_factor: default_safety_factor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AerationDemand {
    pub current_do: f64,
    pub target_do: f64,
    /// kg O2 to lift the whole volume to target, 3 decimals
    pub oxygen_deficit_kg: f64,
    /// kg O2 per hour consumed by the stock, 3 decimals
    pub hourly_respiration_kg: f64,
    /// (deficit + respiration) * safety factor, 3 decimals
    pub total_o2_need_kg: f64,
    /// 2 decimals
    pub recommended_aerator_hp: f64,
}

fn check(field: &'static str, value: f64) -> Result<f64, AerationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AerationError::InvalidInput { field, value })
    }
}

/// Oxygen demand for one pond. 1 mg/L = 1 g/m³ = 0.001 kg/m³. A current
/// level above target is no deficit.
pub fn oxygen_demand(current_do: f64, pond: &PondSettings) -> Result<AerationDemand, AerationError> {
    let current_do = check("current_do", current_do)?;
    let target_do = check("target_do", pond.target_do)?;
    let volume_m3 = check("volume_m3", pond.volume_m3)?;
    let avg_weight_g = check("avg_weight_g", pond.avg_weight_g)?;
    let safety_factor = check("safety_factor", pond.safety_factor)?;

    let oxygen_deficit_kg = (target_do - current_do).max(0.0) * volume_m3 * 0.001;
    let biomass_kg = pond.fish_count as f64 * avg_weight_g / 1000.0;
    let hourly_respiration_kg = biomass_kg * RESPIRATION_RATE;
    let total_o2_need_kg = (oxygen_deficit_kg + hourly_respiration_kg) * safety_factor;
    let recommended_aerator_hp = total_o2_need_kg / AERATOR_TRANSFER_RATE;

    Ok(AerationDemand {
        current_do,
        target_do,
        oxygen_deficit_kg: round_to(oxygen_deficit_kg, 3),
        hourly_respiration_kg: round_to(hourly_respiration_kg, 3),
        total_o2_need_kg: round_to(total_o2_need_kg, 3),
        recommended_aerator_hp: round_to(recommended_aerator_hp, 2),
    })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AerationRecommendation {
    pub trend: TrendResult,
    /// `None` without a current DO value
    pub demand: Option<AerationDemand>,
    pub urgency: AlertLevel,
}

/// DO trend + demand sizing for the reference pond.
pub struct AerationAdvisor {
    pond: PondSettings,
    trend: TrendAnalyzer,
}

impl AerationAdvisor {
    pub fn new(pond: PondSettings, oxygen: &OxygenSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            pond,
            trend: TrendAnalyzer::new(oxygen.profile(), clock),
        }
    }

    pub fn pond(&self) -> &PondSettings {
        &self.pond
    }

    pub fn recommend(&self, history: &[Reading]) -> Result<AerationRecommendation, AerationError> {
        let trend = self.trend.analyze(history);
        let demand = match trend.current_value {
            Some(current) => Some(oxygen_demand(current, &self.pond)?),
            None => None,
        };
        Ok(AerationRecommendation {
            urgency: trend.alert_level,
            trend,
            demand,
        })
    }
}
