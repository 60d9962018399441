//! Run orchestration over the year/week matrix.

pub mod cancel;
pub mod orchestrator;
pub mod report;

pub use cancel::CancelToken;
pub use orchestrator::Orchestrator;
pub use report::{FailedUnit, FailedYear, RunReport};
