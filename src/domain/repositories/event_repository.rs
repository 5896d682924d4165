//! Repository trait for the append-only event log.

use crate::domain::entities::{DailyActiveUsers, ElementStat, Event, UserPathEntry};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for durable event storage and the analytics queries
/// that read it back.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgEventRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Appends one event row.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn insert(&self, event: &Event) -> Result<(), AppError>;

    /// Most recent events of a user, newest first.
    async fn recent_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<UserPathEntry>, AppError>;

    /// Distinct users per calendar day over the last `days` days, oldest day first.
    async fn daily_active_users(&self, days: i64) -> Result<Vec<DailyActiveUsers>, AppError>;

    /// Most clicked non-empty elements over the last 24 hours.
    async fn hot_elements(&self, limit: i64) -> Result<Vec<ElementStat>, AppError>;

    /// Deletes events stored more than `days` days ago, returning the number removed.
    async fn delete_older_than(&self, days: i64) -> Result<u64, AppError>;

    /// Total number of stored events.
    async fn count(&self) -> Result<i64, AppError>;
}
