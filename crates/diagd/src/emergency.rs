//! Emergency override detection.
//!
//! Runs on the raw snapshot, independent of matrix scoring, so a power loss
//! or an oxygen crash is reported even when no diagnosis matches.

use std::collections::HashMap;

use pond_core::{DataValue, Emergency, EmergencyKind, Snapshot, Verdict};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A named rule outcome that raises an emergency when it holds (PASS).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmergencyRule {
    /// Rule param watched in the snapshot
    pub param: String,
    pub kind: EmergencyKind,
    pub title: String,
    /// Prefix of the detail line, followed by the observed value
    pub detail_label: String,
    #[serde(default)]
    pub unit: String,
    pub action: String,
}

impl EmergencyRule {
    fn render(&self, value: Option<&DataValue>) -> Emergency {
        let value = value.map(|v| v.value.as_str()).unwrap_or("?");
        let detail = if self.unit.is_empty() {
            format!("{}: {}", self.detail_label, value)
        } else {
            format!("{}: {} {}", self.detail_label, value, self.unit)
        };
        Emergency {
            kind: self.kind,
            title: self.title.clone(),
            detail,
            action: self.action.clone(),
        }
    }
}

/// Built-in watch list: power loss and critically low oxygen.
pub fn default_emergency_rules() -> Vec<EmergencyRule> {
    vec![
        EmergencyRule {
            param: "Power Outage".to_string(),
            kind: EmergencyKind::Power,
            title: "POWER OUTAGE".to_string(),
            detail_label: "AC status".to_string(),
            unit: String::new(),
            action: "1. Check mains supply / start the generator\n\
                     2. Run aerators manually\n\
                     3. Stop feeding"
                .to_string(),
        },
        EmergencyRule {
            param: "Low DO".to_string(),
            kind: EmergencyKind::Oxygen,
            title: "CRITICAL OXYGEN".to_string(),
            detail_label: "DO".to_string(),
            unit: "mg/L".to_string(),
            action: "1. Add aeration immediately\n\
                     2. Reduce feeding\n\
                     3. Check blower condition"
                .to_string(),
        },
    ]
}

#[derive(Debug, Clone)]
pub struct EmergencyDetector {
    rules: Vec<EmergencyRule>,
}

impl Default for EmergencyDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EmergencyDetector {
    pub fn new() -> Self {
        Self {
            rules: default_emergency_rules(),
        }
    }

    pub fn with_rules(rules: Vec<EmergencyRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[EmergencyRule] {
        &self.rules
    }

    /// Emergencies for every watched rule that holds, power first, then
    /// oxygen, then the rest; watch-list order within a kind.
    pub fn detect(
        &self,
        snapshot: &Snapshot,
        data_values: &HashMap<String, DataValue>,
    ) -> Vec<Emergency> {
        let mut emergencies: Vec<Emergency> = self
            .rules
            .iter()
            .filter(|rule| snapshot.get(&rule.param) == Some(Verdict::Pass))
            .map(|rule| rule.render(data_values.get(&rule.param)))
            .collect();

        emergencies.sort_by_key(|e| e.kind);

        for e in &emergencies {
            warn!(kind = e.kind.as_str(), title = %e.title, detail = %e.detail, "Emergency detected");
        }
        emergencies
    }
}
