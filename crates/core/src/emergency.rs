use serde::{Deserialize, Serialize};

/// Emergency class. Declaration order is display order: infrastructure
/// failures first, then oxygen, then everything else.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergencyKind {
    Power,
    Oxygen,
    Other,
}

impl EmergencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyKind::Power => "POWER",
            EmergencyKind::Oxygen => "DO",
            EmergencyKind::Other => "OTHER",
        }
    }
}

/// An immediate-action alert, surfaced ahead of any diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Emergency {
    #[serde(rename = "type")]
    pub kind: EmergencyKind,
    pub title: String,
    pub detail: String,
    pub action: String,
}
