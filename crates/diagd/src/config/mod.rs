// config/mod.rs
// Diagnosis configuration: rule set, matrix, loader and TTL cache

pub mod cache;
pub mod loader;
pub mod types;

pub use cache::ConfigCache;
pub use loader::ConfigLoader;
pub use types::{DiagnosisConfig, DiagnosisMatrix, Expectation, MatrixRow, Operator, Rule};

use pond_core::{ErrorCode, ErrorReport};
use thiserror::Error;

use crate::source::SourceError;

/// Config load failures. Every variant maps to `ConfigUnavailable`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config table '{table}' unavailable: {source}")]
    Unavailable {
        table: String,
        #[source]
        source: SourceError,
    },

    #[error("Config malformed: {0}")]
    Malformed(String),

    #[error("Config cache lock poisoned")]
    LockPoisoned,
}

impl ConfigError {
    pub fn report(&self) -> ErrorReport {
        let report = ErrorReport::new(ErrorCode::ConfigUnavailable, self.to_string());
        match self {
            ConfigError::Unavailable { table, .. } => report.with_subject(table),
            _ => report,
        }
    }
}
