//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /health`   - Health check with pipeline counters
//! - `POST /api/events` - Event ingestion (optionally rate limited per IP)
//! - `GET  /api/...`  - Cached statistics and analytics
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **CORS** - Browser SDKs post events cross-origin
//! - **Timeout** - Every request has a bounded deadline (408 on expiry)
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::rate_limit::{self, RateLimit};
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use std::time::Duration;
use tower::Layer;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::timeout::TimeoutLayer;

/// HTTP settings that shape the router.
#[derive(Debug, Clone, Copy)]
pub struct RouterOptions {
    pub request_timeout: Duration,
    pub rate_limit: Option<RateLimit>,
    /// When `true`, rate limiting reads client IP from `X-Forwarded-For` /
    /// `X-Real-IP` instead of the peer socket address; enable only behind a
    /// trusted reverse proxy.
    pub behind_proxy: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            rate_limit: None,
            behind_proxy: false,
        }
    }
}

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState, options: RouterOptions) -> NormalizePath<Router> {
    let ingest = api::routes::ingest_routes();
    let ingest = match options.rate_limit {
        Some(limit) if options.behind_proxy => match rate_limit::proxy_layer(limit) {
            Some(layer) => ingest.layer(layer),
            None => ingest,
        },
        Some(limit) => match rate_limit::peer_layer(limit) {
            Some(layer) => ingest.layer(layer),
            None => ingest,
        },
        None => ingest,
    };

    let api_router = Router::new()
        .merge(ingest)
        .merge(api::routes::read_routes());

    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .with_state(state)
        .layer(timeout_layer(options.request_timeout))
        .layer(CorsLayer::permissive())
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// Answers 408 Request Timeout once `timeout` elapses.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}
