//! Cached real-time statistics read from the fast store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::entities::analytics::percentage;
use crate::domain::entities::{DashboardStats, EventStats, EventType, PageStat};
use crate::error::AppError;
use crate::infrastructure::cache::{CacheAside, CachePolicies};
use crate::infrastructure::store::{RealtimeStore, keys};

/// Number of hot pages shown on the dashboard.
pub const DASHBOARD_HOT_PAGES: usize = 5;

/// Cached online user count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUsers {
    pub online_users: i64,
}

/// Cached purchase/view conversion rate, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionRate {
    pub conversion_rate: f64,
}

/// Read-only statistics over the real-time counters.
///
/// Every query goes through [`CacheAside`] with its own [`CachePolicy`]
/// (see [`CachePolicies`]), so results may lag the counters by up to the
/// policy TTL.
///
/// [`CachePolicy`]: crate::infrastructure::cache::CachePolicy
pub struct StatsService {
    store: Arc<dyn RealtimeStore>,
    cache: CacheAside,
    policies: CachePolicies,
}

impl StatsService {
    pub fn new(store: Arc<dyn RealtimeStore>, policies: CachePolicies) -> Self {
        Self {
            cache: CacheAside::new(store.clone()),
            store,
            policies,
        }
    }

    /// Number of users seen in the last five minutes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] on a cache miss with the store down.
    pub async fn online_users(&self, now: DateTime<Utc>) -> Result<OnlineUsers, AppError> {
        let policy = self.policies.online_users;
        let key = policy.key("online_users", &[], now);

        self.cache
            .get_or_compute(&key, policy.ttl, || async {
                let online_users = self.store.set_cardinality(keys::ONLINE_USERS).await?;
                Ok::<_, AppError>(OnlineUsers { online_users })
            })
            .await
    }

    /// Top `limit` pages by view and click score, highest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] on a cache miss with the store down.
    pub async fn hot_pages(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<PageStat>, AppError> {
        let policy = self.policies.hot_pages;
        let limit_param = limit.to_string();
        let key = policy.key("hot_pages_list", &[&limit_param], now);

        self.cache
            .get_or_compute(&key, policy.ttl, || self.read_hot_pages(limit))
            .await
    }

    /// Total events and a per-type breakdown over every accepted type.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] on a cache miss with the store down.
    pub async fn event_stats(&self, now: DateTime<Utc>) -> Result<EventStats, AppError> {
        let policy = self.policies.event_stats;
        let key = policy.key("event_stats", &[], now);

        self.cache
            .get_or_compute(&key, policy.ttl, || async {
                let total_events = self.store.get_counter(keys::TOTAL_EVENTS).await?;
                Ok::<_, AppError>(EventStats {
                    total_events,
                    events_by_type: self.read_events_by_type().await?,
                    timestamp: now,
                })
            })
            .await
    }

    /// Purchases as a percentage of views.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] on a cache miss with the store down.
    pub async fn conversion_rate(&self, now: DateTime<Utc>) -> Result<ConversionRate, AppError> {
        let policy = self.policies.conversion_rate;
        let key = policy.key("conversion_rate", &[], now);

        self.cache
            .get_or_compute(&key, policy.ttl, || async {
                Ok::<_, AppError>(ConversionRate {
                    conversion_rate: self.read_conversion_rate().await?,
                })
            })
            .await
    }

    /// Everything the dashboard shows, cached per hour.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] on a cache miss with the store down.
    pub async fn dashboard(&self, now: DateTime<Utc>) -> Result<DashboardStats, AppError> {
        let policy = self.policies.dashboard;
        let key = policy.key("dashboard_stats", &[], now);

        self.cache
            .get_or_compute(&key, policy.ttl, || async {
                Ok::<_, AppError>(DashboardStats {
                    online_users: self.store.set_cardinality(keys::ONLINE_USERS).await?,
                    total_events: self.store.get_counter(keys::TOTAL_EVENTS).await?,
                    events_by_type: self.read_events_by_type().await?,
                    hot_pages: self.read_hot_pages(DASHBOARD_HOT_PAGES).await?,
                    conversion_rate: self.read_conversion_rate().await?,
                })
            })
            .await
    }

    async fn read_hot_pages(&self, limit: usize) -> Result<Vec<PageStat>, AppError> {
        let top = self.store.top_by_score(keys::HOT_PAGES, limit).await?;
        Ok(top
            .into_iter()
            .map(|(page_url, score)| PageStat {
                page_url,
                views: score as i64,
            })
            .collect())
    }

    async fn read_events_by_type(&self) -> Result<BTreeMap<String, i64>, AppError> {
        let keys: Vec<String> = EventType::ALL
            .iter()
            .map(|t| keys::events_of_type(t.as_str()))
            .collect();
        let counts = self.store.get_counters(&keys).await?;

        Ok(EventType::ALL
            .iter()
            .zip(counts)
            .map(|(t, count)| (t.as_str().to_string(), count))
            .collect())
    }

    async fn read_conversion_rate(&self) -> Result<f64, AppError> {
        let counts = self
            .store
            .get_counters(&[keys::events_of_type("purchase"), keys::events_of_type("view")])
            .await?;
        let (purchases, views) = (counts.first().copied(), counts.get(1).copied());

        Ok(percentage(purchases.unwrap_or(0), views.unwrap_or(0)))
    }
}
