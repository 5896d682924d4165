//! Repository trait for user profiles.

use crate::domain::entities::{UserActivity, UserProfile};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for [`UserProfile`] records.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUserRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates the profile on first sight or counts one more event on it.
    ///
    /// Implementations must make create-or-increment a single atomic step so
    /// two concurrent events for a new user neither fail nor lose a count.
    /// `last_visit` never moves backwards.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn record_activity(&self, activity: UserActivity) -> Result<UserProfile, AppError>;

    /// Looks a profile up by user id.
    async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, AppError>;

    /// Total number of known users.
    async fn count(&self) -> Result<i64, AppError>;
}
