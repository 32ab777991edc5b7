//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! calculator health statistics.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = concat!("hive-metrics-exporter ", env!("CARGO_PKG_VERSION"));

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    state.health_stats.record_http_request();

    // Derive HTTP status from the latest cycle
    let (status, message) = if state.health_stats.total_cycles() == 0 {
        (StatusCode::SERVICE_UNAVAILABLE, "Waiting for first cycle")
    } else if state.health_stats.is_healthy() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Listing failed for some kinds")
    };

    let table = state.health_stats.render_table();

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "{message}\n\nbackend: {}\n\n{table}\n{FOOTER_TEXT}",
            state.backend
        ),
    )
}
