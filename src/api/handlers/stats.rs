//! Handlers for cached real-time statistics.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::Utc;
use validator::Validate;

use crate::api::dto::stats::{
    ConversionRateResponse, HotPagesParams, HotPagesResponse, OnlineUsersResponse,
};
use crate::domain::entities::{DashboardStats, EventStats};
use crate::error::AppError;
use crate::state::AppState;

/// `GET /api/stats/online` - users seen in the last five minutes.
pub async fn online_users_handler(
    State(state): State<AppState>,
) -> Result<Json<OnlineUsersResponse>, AppError> {
    let now = Utc::now();
    let online = state.stats.online_users(now).await?;

    Ok(Json(OnlineUsersResponse {
        count: online.online_users,
        timestamp: now,
    }))
}

/// `GET /api/stats/hot-pages?limit=` - pages ranked by views and clicks.
///
/// `limit` defaults to 10 and must be between 1 and 100.
pub async fn hot_pages_handler(
    State(state): State<AppState>,
    params: Result<Query<HotPagesParams>, QueryRejection>,
) -> Result<Json<HotPagesResponse>, AppError> {
    let Query(params) = params?;
    params.validate()?;

    let now = Utc::now();
    let pages = state.stats.hot_pages(params.limit(), now).await?;

    Ok(Json(HotPagesResponse {
        pages,
        timestamp: now,
    }))
}

/// `GET /api/stats/events` - total and per-type event counters.
pub async fn event_stats_handler(
    State(state): State<AppState>,
) -> Result<Json<EventStats>, AppError> {
    Ok(Json(state.stats.event_stats(Utc::now()).await?))
}

/// `GET /api/stats/conversion` - purchases per view, in percent.
pub async fn conversion_rate_handler(
    State(state): State<AppState>,
) -> Result<Json<ConversionRateResponse>, AppError> {
    let now = Utc::now();
    let rate = state.stats.conversion_rate(now).await?;

    Ok(Json(ConversionRateResponse {
        rate: rate.conversion_rate,
        timestamp: now,
    }))
}

/// `GET /api/stats/dashboard` - online users, totals, top-5 pages and conversion.
pub async fn dashboard_handler(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(state.stats.dashboard(Utc::now()).await?))
}
