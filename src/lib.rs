//! hive-metrics-exporter — cluster-wide Hive aggregate metrics.
//!
//! Some facts about a Hive installation ("how many cluster deployments
//! exist, how many are installed") are global aggregates that no single
//! reconcile event owns. The [`Calculator`] recomputes them on a fixed
//! cadence by listing current state and publishes them as Prometheus
//! gauges.

pub mod calculator;
pub mod config;
pub mod health_stats;
pub mod listing;
pub mod metrics;
pub mod resource;

pub use calculator::{
    aggregate, default_tracked_kinds, Calculator, CalculatorError, CounterSpec, CycleReport,
    KindOutcome, Predicate, PublishedCounter, TrackedKind,
};
pub use config::{config_path, load_config, validate_effective_config, Config, ConfigError};
pub use health_stats::{HealthStats, KindStatus};
pub use listing::{FileLister, KubeLister, ListError, ResourceLister, SnapshotFile};
pub use metrics::{GaugeSink, HiveMetrics, Telemetry};
pub use resource::{LabelSelector, ResourceItem, ResourceKind};
