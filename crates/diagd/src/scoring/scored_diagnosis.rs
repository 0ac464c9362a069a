// scoring/scored_diagnosis.rs
// A matrix row scored against one snapshot

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredDiagnosis {
    /// Index column of the matrix row (may be blank)
    #[serde(default)]
    pub index: String,
    pub diagnosis: String,
    /// Blended score, 0..=100
    pub final_score: f64,
    /// matched / total * 100
    pub match_ratio: f64,
    pub matched: usize,
    pub total: usize,
    pub frequency: f64,
    /// min(total, depth cap) / depth cap
    pub depth_weight: f64,
    /// frequency / sum of eligible frequencies
    pub prior: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

impl ScoredDiagnosis {
    /// Integer confidence as shown to farmers (truncated, not rounded).
    pub fn confidence(&self) -> u32 {
        self.final_score.clamp(0.0, 100.0) as u32
    }

    /// Display name clipped to `max` characters with an ellipsis.
    pub fn short_name(&self, max: usize) -> String {
        if self.diagnosis.chars().count() > max {
            let clipped: String = self.diagnosis.chars().take(max).collect();
            format!("{}...", clipped)
        } else {
            self.diagnosis.clone()
        }
    }
}
