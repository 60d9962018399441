//! Dropdown navigation and settle waits.

pub mod navigator;
pub mod wait;

pub use navigator::{DropdownNavigator, NavState, WEEK_CONTROL, YEAR_CONTROL};
pub use wait::{ContentFingerprint, WaitConfig, WaitTimeout};
