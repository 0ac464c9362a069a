pub mod emergency;
pub mod error;
pub mod reading;
pub mod severity;
pub mod snapshot;
pub mod verdict;

pub use emergency::{Emergency, EmergencyKind};
pub use error::{ErrorCode, ErrorReport};
pub use reading::Reading;
pub use severity::{AlertLevel, Urgency};
pub use snapshot::{DataValue, MissingReason, Snapshot, SnapshotEntry};
pub use verdict::Verdict;
