//! Spinner shown while a scrape walks the year/week matrix.

use crate::audit::{UnitEvent, UnitStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("\u{25b8}\u{25b9}\u{25b8}\u{25b9}\u{25b8}")
}

/// Create a simple spinner for general operations.
pub fn create_spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(spinner_style());
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// One-line description of a finished unit.
pub fn unit_message(event: &UnitEvent) -> String {
    let outcome = match event.status {
        UnitStatus::Ok => format!("{} ranked", event.rows),
        UnitStatus::Empty => "no rankings".to_string(),
        UnitStatus::Failed => "failed".to_string(),
    };
    format!("{} {:<14} {outcome}", event.year, event.week)
}

/// Stop the spinner and leave a final line behind.
pub fn finish(bar: &ProgressBar, message: &str) {
    bar.set_style(
        ProgressStyle::with_template("  {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.finish_with_message(message.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_message() {
        let mut event = UnitEvent::new("2023", "Week 10", UnitStatus::Ok);
        event.rows = 25;
        assert_eq!(unit_message(&event), "2023 Week 10        25 ranked");

        let failed = UnitEvent::new("2023", "Final", UnitStatus::Failed);
        assert!(unit_message(&failed).ends_with("failed"));
    }
}
