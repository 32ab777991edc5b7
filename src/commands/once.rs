//! Once command implementation.
//!
//! Runs a single calculation cycle against the configured backend and
//! prints the resulting Prometheus exposition.

use anyhow::{anyhow, bail};
use hive_metrics_exporter::{Calculator, HiveMetrics, KindOutcome, ResourceLister};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::handlers::metrics::encode_registry;

pub async fn command_once(
    lister: Arc<dyn ResourceLister>,
    interval: Duration,
    query_timeout: Duration,
) -> anyhow::Result<()> {
    let registry = Registry::new();
    let metrics = Arc::new(HiveMetrics::new(&registry)?);
    let calculator =
        Calculator::new(lister, metrics, interval)?.with_query_timeout(query_timeout)?;

    let report = calculator.run_cycle().await;
    info!(
        "Cycle finished in {:.3}s with {} failure(s)",
        report.duration.as_secs_f64(),
        report.failures()
    );

    let body = encode_registry(&registry).map_err(|_| anyhow!("failed to encode metrics"))?;
    print!("{body}");

    for outcome in &report.outcomes {
        if let KindOutcome::Failed { kind, error } = outcome {
            eprintln!("{kind}: {error}");
        }
    }
    if report.failures() > 0 {
        bail!("{} resource kind(s) could not be listed", report.failures());
    }
    Ok(())
}
