// validation/mod.rs
// Model validation: prediction log, outcomes, confusion matrices

pub mod confusion;
pub mod record;
pub mod store;
pub mod tracker;

pub use confusion::{ConfusionMatrix, Improvement, ImprovementIssue, Metrics, PerClassMetrics};
pub use record::{canonical_labels, PredictionRecord};
pub use store::{InMemoryPredictionStore, JsonlPredictionStore, PredictionStore, StoreError};
pub use tracker::{ConfusionReport, ValidationError, ValidationTracker};
