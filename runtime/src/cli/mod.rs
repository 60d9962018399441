//! CLI subcommand implementations for the `cfp-rankings` binary.

pub mod doctor;
pub mod extract_cmd;
pub mod inspect_cmd;
pub mod output;
pub mod progress;
pub mod scrape_cmd;
