//! Operator audit trail.

pub mod logger;

pub use logger::{AuditLogger, UnitEvent, UnitStatus};
