//! Command implementations for the CLI
//!
//! - watch: interactive chart of one metric (default)
//! - list: print the metric names exposed by the endpoint

pub mod list;
pub mod watch;
