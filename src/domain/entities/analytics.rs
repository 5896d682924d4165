//! Derived analytics shapes returned by the read side.
//!
//! None of these are stored as-is: they are recomputed from real-time
//! counters or the event table on a cache miss and then cached as JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Percentage of `numerator` relative to `denominator`, 0 when the denominator is 0.
pub fn percentage(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 * 100.0 / denominator as f64
}

/// A page and its leaderboard score (views + clicks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageStat {
    pub page_url: String,
    pub views: i64,
}

/// Snapshot served to the main dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub online_users: i64,
    pub total_events: i64,
    pub events_by_type: BTreeMap<String, i64>,
    pub hot_pages: Vec<PageStat>,
    pub conversion_rate: f64,
}

/// Global and per-type event counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStats {
    pub total_events: i64,
    pub events_by_type: BTreeMap<String, i64>,
    pub timestamp: DateTime<Utc>,
}

/// One stage of the purchase funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStep {
    #[serde(rename = "step")]
    pub name: String,
    #[serde(rename = "users")]
    pub user_count: i64,
    #[serde(rename = "conversion_rate")]
    pub conversion_rate_pct: f64,
}

/// Point-in-time purchase funnel computed from event-type counters.
///
/// This is not a cohort funnel: each step is the raw counter for its event
/// type, and every rate is relative to the `view` counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelResult {
    pub steps: Vec<FunnelStep>,
    pub total_users: i64,
    #[serde(rename = "conversion_rate")]
    pub overall_conversion_rate_pct: f64,
}

impl FunnelResult {
    /// Builds the four-step funnel from raw counters.
    pub fn from_counts(views: i64, clicks: i64, add_to_cart: i64, purchases: i64) -> Self {
        let step = |name: &str, count: i64| FunnelStep {
            name: name.to_string(),
            user_count: count,
            conversion_rate_pct: percentage(count, views),
        };

        let steps = vec![
            FunnelStep {
                name: "Page view".to_string(),
                user_count: views,
                conversion_rate_pct: 100.0,
            },
            step("Product click", clicks),
            step("Add to cart", add_to_cart),
            step("Purchase", purchases),
        ];

        Self {
            steps,
            total_users: views,
            overall_conversion_rate_pct: percentage(purchases, views),
        }
    }
}

/// A single entry of a user's recent event path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPathEntry {
    pub event_type: String,
    pub page_url: String,
    pub element: Option<String>,
    pub timestamp: i64,
    pub created_at: DateTime<Utc>,
}

/// Distinct users seen on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActiveUsers {
    pub date: NaiveDate,
    pub users: i64,
}

/// A clicked element and its click count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStat {
    pub element: String,
    pub clicks: i64,
}
