//! Metrics endpoint handler for Prometheus scraping.
//!
//! Gauges are written by the calculator task; scraping only encodes the
//! registry in Prometheus text format.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, Registry, TextEncoder};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 16 * 1024;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Encodes every metric family of the registry in text exposition format.
pub fn encode_registry(registry: &Registry) -> Result<String, MetricsError> {
    let families = registry.gather();
    let mut buffer = Vec::with_capacity(BUFFER_CAP);
    let encoder = TextEncoder::new();

    if encoder.encode(&families, &mut buffer).is_err() {
        error!("Failed to encode Prometheus metrics");
        return Err(MetricsError::EncodingFailed);
    }

    String::from_utf8(buffer).map_err(|_| MetricsError::EncodingFailed)
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<String, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    state.health_stats.record_http_request();
    let body = encode_registry(&state.registry)?;

    debug!(
        "Metrics request completed: {} bytes, {:.3}ms",
        body.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_metrics_exporter::{GaugeSink, HiveMetrics};

    #[test]
    fn encodes_registered_gauges() {
        let registry = Registry::new();
        let metrics = HiveMetrics::new(&registry).unwrap();
        metrics.set_gauge("hive_install_jobs_total", 4.0);

        let body = encode_registry(&registry).unwrap();
        assert!(body.contains("# HELP hive_install_jobs_total"));
        assert!(body.contains("hive_install_jobs_total 4"));
    }

    #[test]
    fn empty_registry_encodes_to_empty_body() {
        let body = encode_registry(&Registry::new()).unwrap();
        assert!(body.is_empty());
    }
}
