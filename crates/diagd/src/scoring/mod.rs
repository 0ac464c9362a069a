// scoring/mod.rs
// Matrix scoring: weighted match ratio blended with historical priors

pub mod matrix_scorer;
pub mod scored_diagnosis;

pub use matrix_scorer::{MatrixScorer, MissingDataPolicy, ScorerConfig, DEPTH_CAP};
pub use scored_diagnosis::ScoredDiagnosis;
