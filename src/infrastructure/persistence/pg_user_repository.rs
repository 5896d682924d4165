//! PostgreSQL implementation of the user repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{UserActivity, UserProfile};
use crate::domain::repositories::UserRepository;
use crate::error::AppError;

/// PostgreSQL repository for the `users` table.
pub struct PgUserRepository {
    pool: Arc<PgPool>,
}

impl PgUserRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    first_visit: DateTime<Utc>,
    last_visit: DateTime<Utc>,
    total_events: i64,
    total_sessions: i32,
    device_type: Option<String>,
    browser: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserProfile {
    fn from(r: UserRow) -> Self {
        UserProfile {
            user_id: r.user_id,
            first_visit: r.first_visit,
            last_visit: r.last_visit,
            total_events: r.total_events,
            total_sessions: r.total_sessions,
            device_type: r.device_type,
            browser: r.browser,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const USER_COLUMNS: &str = "user_id, first_visit, last_visit, total_events, total_sessions, \
                            device_type, browser, created_at, updated_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn record_activity(&self, activity: UserActivity) -> Result<UserProfile, AppError> {
        // A new row starts at total_events = 0; every conflicting insert counts one event.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (
                user_id, first_visit, last_visit, total_events, total_sessions,
                device_type, browser, created_at, updated_at
            )
            VALUES ($1, $2, $2, 0, 1, $3, $4, $2, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET total_events = users.total_events + 1,
                last_visit = GREATEST(users.last_visit, EXCLUDED.last_visit),
                updated_at = EXCLUDED.updated_at
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&activity.user_id)
        .bind(activity.seen_at)
        .bind(&activity.device_type)
        .bind(&activity.browser)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(UserProfile::from))
    }

    async fn count(&self) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool.as_ref())
            .await?;
        Ok(total)
    }
}
