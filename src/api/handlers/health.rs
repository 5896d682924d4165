//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health with pipeline counters.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: Real-time store reachable
/// - **503 Service Unavailable**: Real-time store unreachable (`degraded`)
///
/// The ingest check is informational: a closed ingest (during shutdown) is
/// reported but does not change the status.
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let store_check = if state.store.ping().await {
        CheckStatus::ok("Real-time store reachable")
    } else {
        CheckStatus::error("Real-time store unreachable")
    };

    let ingest_check = if state.ingest.is_closed() {
        CheckStatus::error("Ingest closed")
    } else {
        CheckStatus::ok("Accepting events")
    };

    let healthy = store_check.is_ok();
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            realtime_store: store_check,
            ingest: ingest_check,
        },
        pipeline: state.pipeline.snapshot(),
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
