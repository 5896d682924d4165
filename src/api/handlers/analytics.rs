//! Handlers for user paths, funnels, retention and hot elements.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use chrono::Utc;
use validator::Validate;

use crate::api::dto::analytics::{HotElementsParams, RetentionParams, UserEventsParams};
use crate::application::services::analytics_service::{
    FunnelReport, HotElements, RetentionReport, UserPath,
};
use crate::error::AppError;
use crate::state::AppState;

/// Most recent events of a user, newest first.
///
/// # Endpoint
///
/// `GET /api/user/{user_id}/events?limit=`
///
/// `limit` defaults to 100, max 1000. Cached for an hour per user and limit.
pub async fn user_events_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    params: Result<Query<UserEventsParams>, QueryRejection>,
) -> Result<Json<UserPath>, AppError> {
    let Query(params) = params?;
    params.validate()?;

    let path = state
        .analytics
        .user_path(&user_id, params.limit(), Utc::now())
        .await?;

    Ok(Json(path))
}

/// Conversion funnel view, click, add to cart, purchase.
///
/// # Endpoint
///
/// `GET /api/funnel/{funnel_id}/analysis`
///
/// # Response
///
/// ```json
/// {
///   "funnel_id": "default",
///   "steps": [{"step": "Page view", "users": 100, "conversion_rate": 100.0}],
///   "total_users": 100,
///   "conversion_rate": 2.0,
///   "timestamp": "2024-05-01T09:15:00Z",
///   "cache_key": "funnel_default_202405010915"
/// }
/// ```
pub async fn funnel_analysis_handler(
    State(state): State<AppState>,
    Path(funnel_id): Path<String>,
) -> Result<Json<FunnelReport>, AppError> {
    Ok(Json(state.analytics.funnel(&funnel_id, Utc::now()).await?))
}

/// `GET /api/analytics/retention?days=` - distinct users per day (default 7, max 90).
pub async fn retention_handler(
    State(state): State<AppState>,
    params: Result<Query<RetentionParams>, QueryRejection>,
) -> Result<Json<RetentionReport>, AppError> {
    let Query(params) = params?;
    params.validate()?;

    Ok(Json(
        state.analytics.retention(params.days(), Utc::now()).await?,
    ))
}

/// `GET /api/analytics/hot-elements?limit=` - most clicked elements of the last 24 h.
pub async fn hot_elements_handler(
    State(state): State<AppState>,
    params: Result<Query<HotElementsParams>, QueryRejection>,
) -> Result<Json<HotElements>, AppError> {
    let Query(params) = params?;
    params.validate()?;

    Ok(Json(
        state
            .analytics
            .hot_elements(params.limit(), Utc::now())
            .await?,
    ))
}
