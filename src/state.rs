//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers. The calculator task holds its own handles to the
//! same gauges and health statistics.

use hive_metrics_exporter::{Config, HealthStats};
use prometheus::Registry;
use std::sync::Arc;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Application state shared across requests.
pub struct AppState {
    pub registry: Registry,
    pub config: Arc<Config>,
    pub health_stats: Arc<HealthStats>,
    /// Human-readable description of the listing backend.
    pub backend: String,
}
