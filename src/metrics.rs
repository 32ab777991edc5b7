//! Prometheus metrics definitions for hive-metrics-exporter.
//!
//! This module defines the Hive aggregate gauges published by the
//! calculator and the exporter's own telemetry.

use prometheus::{Gauge, GaugeVec, IntCounter, IntCounterVec, Opts, Registry};
use tracing::warn;

use crate::resource::ResourceKind;

pub const CLUSTER_DEPLOYMENTS_TOTAL: &str = "hive_cluster_deployments_total";
pub const CLUSTER_DEPLOYMENTS_INSTALLED_TOTAL: &str = "hive_cluster_deployments_installed_total";
pub const INSTALL_JOBS_TOTAL: &str = "hive_install_jobs_total";

/// Capability to publish a named gauge value. Last write wins.
pub trait GaugeSink: Send + Sync {
    fn set_gauge(&self, name: &str, value: f64);
}

/// The Hive aggregate gauges.
#[derive(Clone)]
pub struct HiveMetrics {
    pub cluster_deployments_total: Gauge,
    pub cluster_deployments_installed_total: Gauge,
    pub install_jobs_total: Gauge,
}

impl HiveMetrics {
    /// Creates and registers the Hive gauges with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let cluster_deployments_total = Gauge::with_opts(Opts::new(
            CLUSTER_DEPLOYMENTS_TOTAL,
            "Total number of cluster deployments that exist in Hive.",
        ))?;
        let cluster_deployments_installed_total = Gauge::with_opts(Opts::new(
            CLUSTER_DEPLOYMENTS_INSTALLED_TOTAL,
            "Total number of cluster deployments that are successfully installed.",
        ))?;
        let install_jobs_total = Gauge::with_opts(Opts::new(
            INSTALL_JOBS_TOTAL,
            "Total number of install jobs running in Hive.",
        ))?;

        registry.register(Box::new(cluster_deployments_total.clone()))?;
        registry.register(Box::new(cluster_deployments_installed_total.clone()))?;
        registry.register(Box::new(install_jobs_total.clone()))?;

        Ok(Self {
            cluster_deployments_total,
            cluster_deployments_installed_total,
            install_jobs_total,
        })
    }

    fn gauge(&self, name: &str) -> Option<&Gauge> {
        match name {
            CLUSTER_DEPLOYMENTS_TOTAL => Some(&self.cluster_deployments_total),
            CLUSTER_DEPLOYMENTS_INSTALLED_TOTAL => Some(&self.cluster_deployments_installed_total),
            INSTALL_JOBS_TOTAL => Some(&self.install_jobs_total),
            _ => None,
        }
    }
}

impl GaugeSink for HiveMetrics {
    fn set_gauge(&self, name: &str, value: f64) {
        match self.gauge(name) {
            Some(gauge) => gauge.set(value),
            None => warn!("Ignoring value for unregistered gauge {}", name),
        }
    }
}

/// Exporter self-observation, updated once per cycle.
#[derive(Clone)]
pub struct Telemetry {
    pub cycle_duration: Gauge,
    pub cycles_total: IntCounter,
    pub query_failures: IntCounterVec,
    pub last_success: GaugeVec,
}

impl Telemetry {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let cycle_duration = Gauge::new(
            "hive_metrics_cycle_duration_seconds",
            "Time spent in the last calculation cycle",
        )?;
        let cycles_total = IntCounter::new(
            "hive_metrics_cycles_total",
            "Number of completed calculation cycles",
        )?;
        let query_failures = IntCounterVec::new(
            Opts::new(
                "hive_metrics_query_failures_total",
                "Number of failed listing queries per resource kind",
            ),
            &["kind"],
        )?;
        let last_success = GaugeVec::new(
            Opts::new(
                "hive_metrics_last_success_timestamp_seconds",
                "Unix time of the last successful listing per resource kind",
            ),
            &["kind"],
        )?;

        registry.register(Box::new(cycle_duration.clone()))?;
        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(query_failures.clone()))?;
        registry.register(Box::new(last_success.clone()))?;

        Ok(Self {
            cycle_duration,
            cycles_total,
            query_failures,
            last_success,
        })
    }

    pub fn record_success(&self, kind: ResourceKind, unix_seconds: f64) {
        self.last_success
            .with_label_values(&[kind.as_str()])
            .set(unix_seconds);
    }

    pub fn record_failure(&self, kind: ResourceKind) {
        self.query_failures.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn record_cycle(&self, duration_seconds: f64) {
        self.cycle_duration.set(duration_seconds);
        self.cycles_total.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    fn render(registry: &Registry) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn set_gauge_by_name() {
        let registry = Registry::new();
        let metrics = HiveMetrics::new(&registry).unwrap();

        metrics.set_gauge(CLUSTER_DEPLOYMENTS_TOTAL, 5.0);
        metrics.set_gauge(CLUSTER_DEPLOYMENTS_INSTALLED_TOTAL, 3.0);
        metrics.set_gauge(INSTALL_JOBS_TOTAL, 2.0);

        assert_eq!(metrics.cluster_deployments_total.get(), 5.0);
        assert_eq!(metrics.cluster_deployments_installed_total.get(), 3.0);
        assert_eq!(metrics.install_jobs_total.get(), 2.0);
    }

    #[test]
    fn unknown_gauge_name_is_ignored() {
        let registry = Registry::new();
        let metrics = HiveMetrics::new(&registry).unwrap();
        metrics.set_gauge("hive_something_else", 9.0);
        assert_eq!(metrics.cluster_deployments_total.get(), 0.0);
    }

    #[test]
    fn exposition_uses_stable_names() {
        let registry = Registry::new();
        let metrics = HiveMetrics::new(&registry).unwrap();
        metrics.set_gauge(CLUSTER_DEPLOYMENTS_TOTAL, 7.0);

        let output = render(&registry);
        assert!(output.contains("# TYPE hive_cluster_deployments_total gauge"));
        assert!(output.contains("hive_cluster_deployments_total 7"));
        assert!(output.contains("hive_cluster_deployments_installed_total 0"));
        assert!(output.contains("hive_install_jobs_total 0"));
    }

    #[test]
    fn double_registration_fails() {
        let registry = Registry::new();
        HiveMetrics::new(&registry).unwrap();
        assert!(HiveMetrics::new(&registry).is_err());
    }

    #[test]
    fn telemetry_per_kind_labels() {
        let registry = Registry::new();
        let telemetry = Telemetry::new(&registry).unwrap();

        telemetry.record_failure(ResourceKind::Job);
        telemetry.record_failure(ResourceKind::Job);
        telemetry.record_success(ResourceKind::ClusterDeployment, 1_700_000_000.0);
        telemetry.record_cycle(0.25);

        assert_eq!(
            telemetry
                .query_failures
                .with_label_values(&["job"])
                .get(),
            2
        );
        assert_eq!(telemetry.cycles_total.get(), 1);

        let output = render(&registry);
        assert!(output.contains("hive_metrics_query_failures_total{kind=\"job\"} 2"));
        assert!(output.contains("hive_metrics_cycle_duration_seconds 0.25"));
    }
}
