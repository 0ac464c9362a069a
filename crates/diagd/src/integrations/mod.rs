// integrations/mod.rs
// Seams to external services: notification gateway and explanation model

pub mod explain;
pub mod notify;

pub use explain::{explain_best_effort, ExplainError, Explanation, ExplanationRequest, ExplanationService};
pub use notify::{LogSink, MemorySink, Notification, NotificationSink, NotifyError};
