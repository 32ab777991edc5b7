//! Periodic aggregate metrics calculation.
//!
//! The [`Calculator`] sweeps current cluster state on a fixed cadence and
//! publishes global aggregates that do not belong to any single
//! reconciliation: list every tracked kind, count items matching
//! predicates, write the counts into gauges, sleep, repeat.
//!
//! ```text
//! Calculator::run()
//!   loop
//!     for each TrackedKind (sequential)
//!       list (bounded by query timeout) ──err──> log, keep previous gauges
//!       aggregate ──> publish via GaugeSink
//!     sleep(interval)
//! ```

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::health_stats::HealthStats;
use crate::listing::{ListError, ResourceLister};
use crate::metrics::{
    GaugeSink, Telemetry, CLUSTER_DEPLOYMENTS_INSTALLED_TOTAL, CLUSTER_DEPLOYMENTS_TOTAL,
    INSTALL_JOBS_TOTAL,
};
use crate::resource::{LabelSelector, ResourceItem, ResourceKind, INSTALL_JOB_LABEL};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculatorError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
    #[error("query timeout must be greater than zero")]
    ZeroQueryTimeout,
}

/// Per-item condition a counter counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Every listed item.
    Always,
    /// Items whose installed status flag is set.
    Installed,
    /// Items carrying a label with an exact value.
    LabelEquals(LabelSelector),
}

impl Predicate {
    pub fn holds(&self, item: &ResourceItem) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Installed => item.installed,
            Predicate::LabelEquals(selector) => selector.matches(item),
        }
    }
}

/// A named gauge and the predicate it counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSpec {
    pub name: &'static str,
    pub predicate: Predicate,
}

impl CounterSpec {
    pub fn new(name: &'static str, predicate: Predicate) -> Self {
        Self { name, predicate }
    }
}

/// A resource kind the calculator lists each cycle, with the counters
/// derived from its snapshot.
#[derive(Debug, Clone)]
pub struct TrackedKind {
    pub kind: ResourceKind,
    pub selector: Option<LabelSelector>,
    pub counters: Vec<CounterSpec>,
}

/// The Hive aggregates: cluster deployments (total and installed) and
/// install jobs.
pub fn default_tracked_kinds() -> Vec<TrackedKind> {
    let install = LabelSelector::new(INSTALL_JOB_LABEL, "true");
    vec![
        TrackedKind {
            kind: ResourceKind::ClusterDeployment,
            selector: None,
            counters: vec![
                CounterSpec::new(CLUSTER_DEPLOYMENTS_TOTAL, Predicate::Always),
                CounterSpec::new(CLUSTER_DEPLOYMENTS_INSTALLED_TOTAL, Predicate::Installed),
            ],
        },
        TrackedKind {
            kind: ResourceKind::Job,
            // Pushed down to the backend; also checked per item in case a
            // backend ignores selectors.
            selector: Some(install.clone()),
            counters: vec![CounterSpec::new(
                INSTALL_JOBS_TOTAL,
                Predicate::LabelEquals(install),
            )],
        },
    ]
}

/// One computed counter value.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedCounter {
    pub name: &'static str,
    pub value: f64,
}

/// Counts the items satisfying each counter's predicate.
pub fn aggregate(items: &[ResourceItem], counters: &[CounterSpec]) -> Vec<PublishedCounter> {
    counters
        .iter()
        .map(|counter| PublishedCounter {
            name: counter.name,
            value: items.iter().filter(|i| counter.predicate.holds(i)).count() as f64,
        })
        .collect()
}

/// What happened to one kind within a cycle.
#[derive(Debug)]
pub enum KindOutcome {
    Published {
        kind: ResourceKind,
        items: usize,
        counters: Vec<PublishedCounter>,
    },
    Failed {
        kind: ResourceKind,
        error: ListError,
    },
}

impl KindOutcome {
    pub fn kind(&self) -> ResourceKind {
        match self {
            KindOutcome::Published { kind, .. } | KindOutcome::Failed { kind, .. } => *kind,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, KindOutcome::Published { .. })
    }
}

#[derive(Debug)]
pub struct CycleReport {
    pub outcomes: Vec<KindOutcome>,
    pub duration: Duration,
}

impl CycleReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    /// Published value for a gauge name in this cycle, if any.
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.outcomes.iter().find_map(|outcome| match outcome {
            KindOutcome::Published { counters, .. } => counters
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.value),
            KindOutcome::Failed { .. } => None,
        })
    }
}

/// Resolves once shutdown is requested or the signal sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Periodically lists tracked kinds and publishes aggregate gauges.
pub struct Calculator {
    lister: Arc<dyn ResourceLister>,
    sink: Arc<dyn GaugeSink>,
    interval: Duration,
    query_timeout: Duration,
    kinds: Vec<TrackedKind>,
    telemetry: Option<Telemetry>,
    health_stats: Option<Arc<HealthStats>>,
}

impl Calculator {
    /// Builds a calculator tracking the default Hive kinds. Performs no I/O.
    pub fn new(
        lister: Arc<dyn ResourceLister>,
        sink: Arc<dyn GaugeSink>,
        interval: Duration,
    ) -> Result<Self, CalculatorError> {
        if interval.is_zero() {
            return Err(CalculatorError::ZeroInterval);
        }
        Ok(Self {
            lister,
            sink,
            interval,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            kinds: default_tracked_kinds(),
            telemetry: None,
            health_stats: None,
        })
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Result<Self, CalculatorError> {
        if timeout.is_zero() {
            return Err(CalculatorError::ZeroQueryTimeout);
        }
        self.query_timeout = timeout;
        Ok(self)
    }

    pub fn with_tracked_kinds(mut self, kinds: Vec<TrackedKind>) -> Self {
        self.kinds = kinds;
        if let Some(stats) = &self.health_stats {
            stats.track(self.kinds.iter().map(|tracked| tracked.kind));
        }
        self
    }

    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn with_health_stats(mut self, stats: Arc<HealthStats>) -> Self {
        stats.track(self.kinds.iter().map(|tracked| tracked.kind));
        self.health_stats = Some(stats);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn tracked_kinds(&self) -> &[TrackedKind] {
        &self.kinds
    }

    /// Runs cycles until shutdown is signalled (or the sender is dropped).
    ///
    /// Shutdown is observed before each query, while a query is in flight,
    /// and during the inter-cycle sleep.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            kinds = self.kinds.len(),
            backend = %self.lister.describe(),
            "metrics calculator started"
        );

        loop {
            let Some(report) = self.run_cycle_until(&mut shutdown).await else {
                break;
            };
            debug!(
                failures = report.failures(),
                duration_secs = report.duration.as_secs_f64(),
                "metrics cycle finished"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancelled(&mut shutdown) => break,
            }
        }

        info!("metrics calculator shutting down");
    }

    /// One full cycle over all tracked kinds, without the trailing sleep.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> CycleReport {
        let start = Instant::now();
        let mut outcomes = Vec::with_capacity(self.kinds.len());
        for tracked in &self.kinds {
            outcomes.push(self.process_kind(tracked).await);
        }
        self.finish_cycle(start, outcomes)
    }

    /// Like [`run_cycle`](Self::run_cycle) but abandons the cycle when
    /// shutdown is requested. Returns `None` if cancelled.
    async fn run_cycle_until(&self, shutdown: &mut watch::Receiver<bool>) -> Option<CycleReport> {
        let start = Instant::now();
        let mut outcomes = Vec::with_capacity(self.kinds.len());
        for tracked in &self.kinds {
            let stopped = *shutdown.borrow();
            if stopped {
                return None;
            }
            tokio::select! {
                outcome = self.process_kind(tracked) => outcomes.push(outcome),
                _ = cancelled(shutdown) => return None,
            }
        }
        Some(self.finish_cycle(start, outcomes))
    }

    fn finish_cycle(&self, start: Instant, outcomes: Vec<KindOutcome>) -> CycleReport {
        let duration = start.elapsed();
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_cycle(duration.as_secs_f64());
        }
        if let Some(stats) = &self.health_stats {
            stats.record_cycle(duration.as_secs_f64());
        }
        CycleReport { outcomes, duration }
    }

    /// List, aggregate and publish one kind. Failures are logged and
    /// reported, never propagated.
    async fn process_kind(&self, tracked: &TrackedKind) -> KindOutcome {
        match self.measure_kind(tracked).await {
            Ok((items, counters)) => {
                debug!(kind = %tracked.kind, items, "loaded {}", tracked.kind);
                for counter in &counters {
                    self.sink.set_gauge(counter.name, counter.value);
                }
                let now = Utc::now();
                if let Some(telemetry) = &self.telemetry {
                    telemetry.record_success(tracked.kind, now.timestamp() as f64);
                }
                if let Some(stats) = &self.health_stats {
                    stats.record_success(tracked.kind, items, now);
                }
                KindOutcome::Published {
                    kind: tracked.kind,
                    items,
                    counters,
                }
            }
            Err(e) => {
                error!(kind = %tracked.kind, error = %e, "error listing {}", tracked.kind);
                if let Some(telemetry) = &self.telemetry {
                    telemetry.record_failure(tracked.kind);
                }
                if let Some(stats) = &self.health_stats {
                    stats.record_failure(tracked.kind, &e.to_string());
                }
                KindOutcome::Failed {
                    kind: tracked.kind,
                    error: e,
                }
            }
        }
    }

    async fn measure_kind(
        &self,
        tracked: &TrackedKind,
    ) -> Result<(usize, Vec<PublishedCounter>), ListError> {
        let listing = self.lister.list(tracked.kind, tracked.selector.as_ref());
        let items = tokio::time::timeout(self.query_timeout, listing)
            .await
            .map_err(|_| ListError::Timeout {
                kind: tracked.kind,
                timeout: self.query_timeout,
            })??;

        Ok((items.len(), aggregate(&items, &tracked.counters)))
    }
}
