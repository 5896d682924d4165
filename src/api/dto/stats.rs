//! DTOs for real-time statistics endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use validator::Validate;

use crate::domain::entities::PageStat;

/// `?limit=` of the hot pages endpoint (default 10).
#[serde_as]
#[derive(Debug, Default, Deserialize, Validate)]
pub struct HotPagesParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

impl HotPagesParams {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(10)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OnlineUsersResponse {
    pub count: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HotPagesResponse {
    pub pages: Vec<PageStat>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversionRateResponse {
    pub rate: f64,
    pub timestamp: DateTime<Utc>,
}
