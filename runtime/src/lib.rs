//! Weekly College Football Playoff rankings scraper.
//!
//! Drives the rankings page's dependent year/week dropdowns in a headless
//! browser, extracts the ranking table for every week and exports validated
//! entries as CSV and JSON.

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod extraction;
pub mod navigation;
pub mod rankings;
pub mod renderer;
pub mod scrape;
