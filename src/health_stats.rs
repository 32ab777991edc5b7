//! Internal health statistics for the exporter.
//!
//! Tracks cycle timings and the latest listing outcome per resource kind,
//! and renders them as the plain-text table served on `/health`.

use ahash::AHashMap as HashMap;
use chrono::{DateTime, Utc};
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::resource::ResourceKind;

#[derive(Clone, Copy, Default)]
struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = RunningStat {
                count: 1,
                sum: value,
                min: value,
                max: value,
                last: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

#[derive(Default)]
struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// (last, avg, max, min, count)
    fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Latest listing outcome for one kind.
#[derive(Debug, Clone, Default)]
pub struct KindStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub last_item_count: Option<usize>,
    pub last_error: Option<String>,
    pub consecutive_failures: u64,
}

impl KindStatus {
    pub fn is_healthy(&self) -> bool {
        self.last_success.is_some() && self.consecutive_failures == 0
    }
}

pub struct HealthStats {
    started: Instant,
    cycle_duration_seconds: Stat,
    total_cycles: AtomicU64,
    http_requests: AtomicU64,
    kinds: Mutex<HashMap<ResourceKind, KindStatus>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            cycle_duration_seconds: Stat::default(),
            total_cycles: AtomicU64::new(0),
            http_requests: AtomicU64::new(0),
            kinds: Mutex::new(HashMap::new()),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    /// Restricts health and the status table to `kinds`. Statuses already
    /// recorded for those kinds are kept.
    pub fn track(&self, kinds: impl IntoIterator<Item = ResourceKind>) {
        if let Ok(mut tracked) = self.kinds.lock() {
            let mut next = HashMap::new();
            for kind in kinds {
                let status = tracked.remove(&kind).unwrap_or_default();
                next.insert(kind, status);
            }
            *tracked = next;
        }
    }

    fn tracked_kinds(&self) -> Vec<ResourceKind> {
        let kinds = match self.kinds.lock() {
            Ok(kinds) => kinds,
            Err(_) => return Vec::new(),
        };
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| kinds.contains_key(kind))
            .collect()
    }

    pub fn record_success(&self, kind: ResourceKind, items: usize, at: DateTime<Utc>) {
        if let Ok(mut kinds) = self.kinds.lock() {
            let status = kinds.entry(kind).or_default();
            status.last_success = Some(at);
            status.last_item_count = Some(items);
            status.last_error = None;
            status.consecutive_failures = 0;
        }
    }

    pub fn record_failure(&self, kind: ResourceKind, error: &str) {
        if let Ok(mut kinds) = self.kinds.lock() {
            let status = kinds.entry(kind).or_default();
            status.last_error = Some(error.to_string());
            status.consecutive_failures += 1;
        }
    }

    pub fn record_cycle(&self, duration_seconds: f64) {
        self.cycle_duration_seconds.add_sample(duration_seconds);
        self.total_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_http_request(&self) {
        self.http_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles.load(Ordering::Relaxed)
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn kind_status(&self, kind: ResourceKind) -> KindStatus {
        self.kinds
            .lock()
            .ok()
            .and_then(|kinds| kinds.get(&kind).cloned())
            .unwrap_or_default()
    }

    /// Healthy once a cycle has completed and every tracked kind's most
    /// recent listing succeeded. Kinds are tracked via [`HealthStats::track`]
    /// or by recording an outcome for them.
    pub fn is_healthy(&self) -> bool {
        let kinds = self.tracked_kinds();
        self.total_cycles() > 0
            && !kinds.is_empty()
            && kinds.iter().all(|kind| self.kind_status(*kind).is_healthy())
    }

    pub fn render_table(&self) -> String {
        let (cd_cur, cd_avg, cd_max, cd_min, _) = self.cycle_duration_seconds.snapshot();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "metric",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(out, "{}", "-".repeat(left_col + 3 + (col_w + 3) * 4)).ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "cycle duration (s)",
            format!("{:.3}", cd_cur),
            format!("{:.3}", cd_avg),
            format!("{:.3}", cd_max),
            format!("{:.3}", cd_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(
            out,
            "{:20} | {:>7} | {:>8} | {:25} | last error",
            "kind", "items", "failures", "last success"
        )
        .ok();
        writeln!(out, "{}", "-".repeat(80)).ok();
        for kind in self.tracked_kinds() {
            let status = self.kind_status(kind);
            writeln!(
                out,
                "{:20} | {:>7} | {:>8} | {:25} | {}",
                kind.as_str(),
                status
                    .last_item_count
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                status.consecutive_failures,
                status
                    .last_success
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string()),
                status.last_error.as_deref().unwrap_or("-"),
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "number of done cycles: {}", self.total_cycles()).ok();
        writeln!(
            out,
            "http requests served: {}",
            self.http_requests.load(Ordering::Relaxed)
        )
        .ok();
        writeln!(out, "uptime (s): {}", self.get_uptime_seconds()).ok();

        out
    }
}
