//! The calculator wired to the snapshot-file lister and real Prometheus gauges.

use hive_metrics_exporter::metrics::CLUSTER_DEPLOYMENTS_TOTAL;
use hive_metrics_exporter::{
    Calculator, CounterSpec, FileLister, HiveMetrics, KindOutcome, ListError, Predicate,
    ResourceKind, TrackedKind,
};
use prometheus::{Encoder, Registry, TextEncoder};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const SNAPSHOT: &str = r#"
cluster_deployments:
  - name: prod-east
    namespace: clusters
    installed: true
  - name: prod-west
    namespace: clusters
    installed: true
  - name: staging
    namespace: clusters
    installed: true
  - name: dev-1
    namespace: dev
  - name: dev-2
    namespace: dev
    installed: false
jobs:
  - name: dev-1-install
    labels:
      hive.openshift.io/install: "true"
  - name: dev-2-install
    labels:
      hive.openshift.io/install: "true"
  - name: staging-imageset
    labels:
      app: imageset
  - name: old-uninstall
    labels:
      hive.openshift.io/uninstall: "true"
"#;

fn gathered(registry: &Registry) -> String {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .unwrap();
    String::from_utf8(buffer).unwrap()
}

#[tokio::test]
async fn one_cycle_publishes_hive_gauges() {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(SNAPSHOT.as_bytes()).unwrap();

    let registry = Registry::new();
    let metrics = Arc::new(HiveMetrics::new(&registry).unwrap());
    let lister = Arc::new(FileLister::new(file.path()));
    let calculator = Calculator::new(lister, metrics.clone(), Duration::from_secs(30)).unwrap();

    let report = calculator.run_cycle().await;

    assert_eq!(report.failures(), 0);
    assert_eq!(metrics.cluster_deployments_total.get(), 5.0);
    assert_eq!(metrics.cluster_deployments_installed_total.get(), 3.0);
    assert_eq!(metrics.install_jobs_total.get(), 2.0);

    let output = gathered(&registry);
    assert!(output.contains("hive_cluster_deployments_total 5"));
    assert!(output.contains("hive_cluster_deployments_installed_total 3"));
    assert!(output.contains("hive_install_jobs_total 2"));
}

#[tokio::test]
async fn removed_snapshot_leaves_gauges_untouched() {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(SNAPSHOT.as_bytes()).unwrap();
    let path = file.path().to_path_buf();

    let registry = Registry::new();
    let metrics = Arc::new(HiveMetrics::new(&registry).unwrap());
    let calculator = Calculator::new(
        Arc::new(FileLister::new(&path)),
        metrics.clone(),
        Duration::from_secs(30),
    )
    .unwrap();

    calculator.run_cycle().await;
    drop(file);

    let report = calculator.run_cycle().await;

    assert_eq!(report.failures(), 2);
    assert_eq!(metrics.cluster_deployments_total.get(), 5.0);
    assert_eq!(metrics.install_jobs_total.get(), 2.0);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn query_timeout_bounds_a_blocked_snapshot_read() {
    let dir = tempfile::tempdir().unwrap();
    let fifo = dir.path().join("snapshot.yaml");
    let status = std::process::Command::new("mkfifo")
        .arg(&fifo)
        .status()
        .unwrap();
    assert!(status.success());

    let registry = Registry::new();
    let metrics = Arc::new(HiveMetrics::new(&registry).unwrap());
    let calculator = Calculator::new(
        Arc::new(FileLister::new(&fifo)),
        metrics.clone(),
        Duration::from_secs(30),
    )
    .unwrap()
    .with_query_timeout(Duration::from_millis(200))
    .unwrap()
    .with_tracked_kinds(vec![TrackedKind {
        kind: ResourceKind::ClusterDeployment,
        selector: None,
        counters: vec![CounterSpec::new(CLUSTER_DEPLOYMENTS_TOTAL, Predicate::Always)],
    }]);

    let report = tokio::time::timeout(Duration::from_secs(5), calculator.run_cycle())
        .await
        .expect("cycle must not wait on the blocked read");

    assert_eq!(report.failures(), 1);
    assert!(matches!(
        &report.outcomes[0],
        KindOutcome::Failed {
            error: ListError::Timeout { .. },
            ..
        }
    ));
    assert_eq!(metrics.cluster_deployments_total.get(), 0.0);

    // Let the parked blocking read finish so the runtime can shut down.
    drop(std::fs::OpenOptions::new().write(true).open(&fifo).unwrap());
}
