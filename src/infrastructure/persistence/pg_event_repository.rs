//! PostgreSQL implementation of the event repository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{DailyActiveUsers, ElementStat, Event, UserPathEntry};
use crate::domain::repositories::EventRepository;
use crate::error::AppError;

/// PostgreSQL repository over the append-only `user_events` table.
pub struct PgEventRepository {
    pool: Arc<PgPool>,
}

impl PgEventRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PathRow {
    event_type: String,
    page_url: String,
    element: Option<String>,
    client_timestamp: i64,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct DailyRow {
    day: NaiveDate,
    users: i64,
}

#[derive(sqlx::FromRow)]
struct ElementRow {
    element: String,
    clicks: i64,
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn insert(&self, event: &Event) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_events (
                user_id, session_id, event_type, page_url, element, element_text,
                position_x, position_y, user_agent, ip_address, client_timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&event.user_id)
        .bind(&event.session_id)
        .bind(&event.event_type)
        .bind(&event.page_url)
        .bind(&event.element)
        .bind(&event.element_text)
        .bind(event.position_x)
        .bind(event.position_y)
        .bind(&event.user_agent)
        .bind(&event.ip_address)
        .bind(event.timestamp)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn recent_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<UserPathEntry>, AppError> {
        let rows = sqlx::query_as::<_, PathRow>(
            r#"
            SELECT event_type, page_url, element, client_timestamp, created_at
            FROM user_events
            WHERE user_id = $1
            ORDER BY client_timestamp DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| UserPathEntry {
                event_type: r.event_type,
                page_url: r.page_url,
                element: r.element,
                timestamp: r.client_timestamp,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn daily_active_users(&self, days: i64) -> Result<Vec<DailyActiveUsers>, AppError> {
        let rows = sqlx::query_as::<_, DailyRow>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   COUNT(DISTINCT user_id) AS users
            FROM user_events
            WHERE created_at >= NOW() - make_interval(days => $1::int)
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(days)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| DailyActiveUsers {
                date: r.day,
                users: r.users,
            })
            .collect())
    }

    async fn hot_elements(&self, limit: i64) -> Result<Vec<ElementStat>, AppError> {
        let rows = sqlx::query_as::<_, ElementRow>(
            r#"
            SELECT element, COUNT(*) AS clicks
            FROM user_events
            WHERE event_type = 'click'
              AND created_at >= NOW() - INTERVAL '24 hours'
              AND element IS NOT NULL
              AND element <> ''
            GROUP BY element
            ORDER BY clicks DESC, element
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ElementStat {
                element: r.element,
                clicks: r.clicks,
            })
            .collect())
    }

    async fn delete_older_than(&self, days: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_events
            WHERE created_at < NOW() - make_interval(days => $1::int)
            "#,
        )
        .bind(days)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_events")
            .fetch_one(self.pool.as_ref())
            .await?;
        Ok(total)
    }
}
