//! Configuration display endpoint handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, error, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the /config endpoint.
#[instrument(skip(state))]
pub async fn config_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /config request");

    state.health_stats.record_http_request();

    match serde_yaml::to_string(state.config.as_ref()) {
        Ok(yaml) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; charset=utf-8")],
            format!("EFFECTIVE CONFIGURATION\n=======================\n\n{yaml}\n{FOOTER_TEXT}"),
        ),
        Err(e) => {
            error!("Failed to render configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain; charset=utf-8")],
                "Failed to render configuration".to_string(),
            )
        }
    }
}
