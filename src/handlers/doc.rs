//! Documentation endpoint handler.
//!
//! This module provides the `/doc` endpoint handler that displays
//! documentation for the exporter.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the /doc endpoint.
#[instrument(skip(state))]
pub async fn doc_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /doc request");

    state.health_stats.record_http_request();

    let version = env!("CARGO_PKG_VERSION");
    let port = state.config.port();
    let doc = format!(
        r#"HIVE METRICS EXPORTER - DOCUMENTATION
=====================================

VERSION: {version}
DESCRIPTION: Prometheus exporter for cluster-wide Hive aggregate metrics

Every interval the exporter lists all ClusterDeployments and all Jobs
labelled hive.openshift.io/install=true, counts them and publishes the
counts as gauges. A failed listing leaves that kind's gauges at their
previous value until a later cycle succeeds.

HTTP ENDPOINTS
--------------
GET /metrics     - Prometheus metrics endpoint
GET /health      - Health check with calculator statistics (plain text)
GET /config      - Current configuration (plain text)
GET /doc         - This documentation (plain text)

AVAILABLE METRICS
-----------------
hive_cluster_deployments_total              - All cluster deployments
hive_cluster_deployments_installed_total    - Cluster deployments with status.installed
hive_install_jobs_total                     - Jobs labelled hive.openshift.io/install=true

hive_metrics_cycle_duration_seconds         - Duration of the last cycle
hive_metrics_cycles_total                   - Completed cycles
hive_metrics_query_failures_total{{kind}}     - Failed listings per kind
hive_metrics_last_success_timestamp_seconds{{kind}} - Last successful listing per kind

CONFIGURATION
-------------
Config file locations (in order):
1. CLI specified: -c /path/to/config.yaml
2. System config: /etc/hive/metrics-exporter.yaml
3. Current directory: ./hive-metrics-exporter.yaml

Key configuration options:
- port: HTTP listen port (default: 9216)
- bind: Bind address (default: 0.0.0.0)
- interval_secs: Seconds between cycles (default: 60)
- query_timeout_secs: Per-listing timeout (default: 30)
- snapshot_file: Read listings from a YAML/JSON file instead of the cluster
- kube_context: Kubeconfig context (default: ambient)
- tls_cert_path / tls_key_path: Serve over HTTPS

CLI COMMANDS
------------
hive-metrics-exporter                       - Start the exporter
hive-metrics-exporter check                 - List every kind once and report
hive-metrics-exporter config -o config.yaml - Generate config file
hive-metrics-exporter once                  - Run one cycle and print metrics
hive-metrics-exporter --help                - Show all CLI options

EXAMPLE PROMQL QUERIES
----------------------
# Cluster deployments still installing
hive_cluster_deployments_total - hive_cluster_deployments_installed_total

# Stale listings (no success for 10 minutes)
time() - hive_metrics_last_success_timestamp_seconds > 600

PROMETHEUS SCRAPE CONFIG
------------------------
scrape_configs:
  - job_name: 'hive-metrics'
    static_configs:
      - targets: ['localhost:{port}']

{FOOTER_TEXT}
"#
    );

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        doc,
    )
}
