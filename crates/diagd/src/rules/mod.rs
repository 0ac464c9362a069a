// rules/mod.rs
// Rule evaluation against freshly fetched sensor tables

pub mod column;
pub mod evaluator;

pub use column::{resolve_column, resolve_instrument_column, ResolvedColumn};
pub use evaluator::{Evaluation, RuleEvaluator};
