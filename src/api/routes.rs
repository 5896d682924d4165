//! API route configuration.

use crate::api::handlers::{
    conversion_rate_handler, dashboard_handler, event_stats_handler, funnel_analysis_handler,
    hot_elements_handler, hot_pages_handler, ingest_events_handler, online_users_handler,
    retention_handler, user_events_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Event ingestion, the only write route.
///
/// - `POST /events` - Accept a batch of events
pub fn ingest_routes() -> Router<AppState> {
    Router::new().route("/events", post(ingest_events_handler))
}

/// Cached read routes.
///
/// # Endpoints
///
/// - `GET /stats/online`                  - Online user count
/// - `GET /stats/hot-pages`               - Top pages by views and clicks
/// - `GET /stats/events`                  - Per-type event counters
/// - `GET /stats/conversion`              - Purchase/view conversion rate
/// - `GET /stats/dashboard`               - Dashboard summary
/// - `GET /user/{user_id}/events`         - A user's recent events
/// - `GET /funnel/{funnel_id}/analysis`   - Conversion funnel
/// - `GET /analytics/retention`           - Daily active users
/// - `GET /analytics/hot-elements`        - Most clicked elements
pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/stats/online", get(online_users_handler))
        .route("/stats/hot-pages", get(hot_pages_handler))
        .route("/stats/events", get(event_stats_handler))
        .route("/stats/conversion", get(conversion_rate_handler))
        .route("/stats/dashboard", get(dashboard_handler))
        .route("/user/{user_id}/events", get(user_events_handler))
        .route("/funnel/{funnel_id}/analysis", get(funnel_analysis_handler))
        .route("/analytics/retention", get(retention_handler))
        .route("/analytics/hot-elements", get(hot_elements_handler))
}
