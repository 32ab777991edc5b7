//! CLI command implementations for hive-metrics-exporter.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: List every tracked kind once
//! - `config`: Configuration file generation
//! - `once`: Single calculation cycle

pub mod check;
pub mod config;
pub mod once;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use once::command_once;
