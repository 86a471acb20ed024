//! Live metric monitor
//!
//! This module scrapes a text exposition endpoint, tracks the series of one
//! selected metric and drives the interactive terminal view.

pub mod app;
pub mod fetcher;
pub mod history;
pub mod legend;
pub mod parser;
pub mod picker;
pub mod registry;
pub mod render;
pub mod ui;

// Re-export commonly used types
pub use app::{Effect, Event, Session, SessionOptions};
pub use fetcher::MetricsFetcher;
pub use parser::Sample;
