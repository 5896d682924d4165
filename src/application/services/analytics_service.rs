//! Cached analytical queries: user paths, funnels, retention and hot elements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::event_processor::EventProcessor;
use crate::domain::entities::{DailyActiveUsers, ElementStat, FunnelResult, UserPathEntry};
use crate::domain::repositories::EventRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheAside, CachePolicies};

/// Recent events of one user, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPath {
    pub user_id: String,
    pub events: Vec<UserPathEntry>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Funnel analysis as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelReport {
    pub funnel_id: String,
    #[serde(flatten)]
    pub funnel: FunnelResult,
    pub timestamp: DateTime<Utc>,
    pub cache_key: String,
}

/// Daily distinct users over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionReport {
    pub days: i64,
    pub daily_active_users: Vec<DailyActiveUsers>,
    pub timestamp: DateTime<Utc>,
}

/// Most clicked elements over the last 24 hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotElements {
    pub elements: Vec<ElementStat>,
    pub timestamp: DateTime<Utc>,
}

pub struct AnalyticsService {
    events: Arc<dyn EventRepository>,
    processor: Arc<EventProcessor>,
    cache: CacheAside,
    policies: CachePolicies,
}

impl AnalyticsService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        processor: Arc<EventProcessor>,
        cache: CacheAside,
        policies: CachePolicies,
    ) -> Self {
        Self {
            events,
            processor,
            cache,
            policies,
        }
    }

    /// The `limit` most recent events of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an empty user id, or the
    /// repository error on a cache miss.
    pub async fn user_path(
        &self,
        user_id: &str,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<UserPath, AppError> {
        if user_id.trim().is_empty() {
            return Err(AppError::bad_request(
                "user_id must not be empty",
                json!({ "field": "user_id" }),
            ));
        }

        let policy = self.policies.user_events;
        let limit_param = limit.to_string();
        let key = policy.key("user_events", &[user_id, &limit_param], now);

        self.cache
            .get_or_compute(&key, policy.ttl, || async {
                let events = self.events.recent_for_user(user_id, limit).await?;
                Ok::<_, AppError>(UserPath {
                    user_id: user_id.to_string(),
                    count: events.len(),
                    events,
                    timestamp: now,
                })
            })
            .await
    }

    /// Conversion funnel snapshot for `funnel_id`.
    ///
    /// All funnel ids read the same four counters; the id only scopes the
    /// cache entry and is echoed back.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] on a cache miss with the store down.
    pub async fn funnel(&self, funnel_id: &str, now: DateTime<Utc>) -> Result<FunnelReport, AppError> {
        let policy = self.policies.funnel;
        let key = policy.key("funnel", &[funnel_id], now);

        self.cache
            .get_or_compute(&key, policy.ttl, || async {
                Ok::<_, AppError>(FunnelReport {
                    funnel_id: funnel_id.to_string(),
                    funnel: self.processor.calculate_funnel().await?,
                    timestamp: now,
                    cache_key: key.to_string(),
                })
            })
            .await
    }

    /// Distinct users per day for the last `days` days.
    ///
    /// # Errors
    ///
    /// Returns the repository error on a cache miss.
    pub async fn retention(&self, days: i64, now: DateTime<Utc>) -> Result<RetentionReport, AppError> {
        let policy = self.policies.retention;
        let days_param = days.to_string();
        let key = policy.key("retention", &[&days_param], now);

        self.cache
            .get_or_compute(&key, policy.ttl, || async {
                Ok::<_, AppError>(RetentionReport {
                    days,
                    daily_active_users: self.events.daily_active_users(days).await?,
                    timestamp: now,
                })
            })
            .await
    }

    /// The `limit` most clicked elements of the last 24 hours.
    ///
    /// # Errors
    ///
    /// Returns the repository error on a cache miss.
    pub async fn hot_elements(&self, limit: i64, now: DateTime<Utc>) -> Result<HotElements, AppError> {
        let policy = self.policies.hot_elements;
        let limit_param = limit.to_string();
        let key = policy.key("hot_elements", &[&limit_param], now);

        self.cache
            .get_or_compute(&key, policy.ttl, || async {
                Ok::<_, AppError>(HotElements {
                    elements: self.events.hot_elements(limit).await?,
                    timestamp: now,
                })
            })
            .await
    }
}
