use chrono::Utc;
use clickstream::domain::entities::Event;
use clickstream::domain::repositories::EventRepository;
use clickstream::infrastructure::persistence::PgEventRepository;
use sqlx::PgPool;
use std::sync::Arc;

fn click(user_id: &str, element: &str, timestamp: i64) -> Event {
    Event {
        element: Some(element.to_string()),
        ..Event::new(user_id, "s1", "click", "/shop", timestamp)
    }
}

#[sqlx::test]
async fn test_insert_and_count(pool: PgPool) {
    let repo = PgEventRepository::new(Arc::new(pool));

    repo.insert(&Event::new("u1", "s1", "view", "/", 1)).await.unwrap();
    repo.insert(&Event::new("u2", "s2", "view", "/", 2)).await.unwrap();

    assert_eq!(repo.count().await.unwrap(), 2);
}

#[sqlx::test]
async fn test_recent_for_user_is_newest_first(pool: PgPool) {
    let repo = PgEventRepository::new(Arc::new(pool));

    for (i, element) in ["#a", "#b", "#c"].iter().enumerate() {
        repo.insert(&click("alice", element, 100 + i as i64)).await.unwrap();
    }
    repo.insert(&click("bob", "#z", 500)).await.unwrap();

    let path = repo.recent_for_user("alice", 2).await.unwrap();

    assert_eq!(path.len(), 2);
    assert_eq!(path[0].element.as_deref(), Some("#c"));
    assert_eq!(path[0].timestamp, 102);
    assert_eq!(path[1].element.as_deref(), Some("#b"));
}

#[sqlx::test]
async fn test_hot_elements_skip_empty_and_non_clicks(pool: PgPool) {
    let repo = PgEventRepository::new(Arc::new(pool));

    repo.insert(&click("u1", "#buy", 1)).await.unwrap();
    repo.insert(&click("u2", "#buy", 1)).await.unwrap();
    repo.insert(&click("u3", "#menu", 1)).await.unwrap();
    repo.insert(&click("u3", "", 1)).await.unwrap();
    repo.insert(&Event {
        element: Some("#buy".to_string()),
        ..Event::new("u4", "s", "view", "/", 1)
    })
    .await
    .unwrap();

    let elements = repo.hot_elements(10).await.unwrap();

    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].element, "#buy");
    assert_eq!(elements[0].clicks, 2);
    assert_eq!(elements[1].element, "#menu");
}

#[sqlx::test]
async fn test_daily_active_users_counts_distinct(pool: PgPool) {
    let repo = PgEventRepository::new(Arc::new(pool.clone()));

    repo.insert(&Event::new("u1", "s", "view", "/", 1)).await.unwrap();
    repo.insert(&Event::new("u1", "s", "click", "/", 2)).await.unwrap();
    repo.insert(&Event::new("u2", "s", "view", "/", 3)).await.unwrap();
    sqlx::query(
        "UPDATE user_events SET created_at = NOW() - INTERVAL '30 days' WHERE user_id = 'u2'",
    )
    .execute(&pool)
    .await
    .unwrap();

    let days = repo.daily_active_users(7).await.unwrap();

    assert_eq!(days.len(), 1);
    assert_eq!(days[0].date, Utc::now().date_naive());
    assert_eq!(days[0].users, 1);
}

#[sqlx::test]
async fn test_delete_older_than(pool: PgPool) {
    let repo = PgEventRepository::new(Arc::new(pool.clone()));

    repo.insert(&Event::new("old", "s", "view", "/", 1)).await.unwrap();
    repo.insert(&Event::new("new", "s", "view", "/", 2)).await.unwrap();
    sqlx::query(
        "UPDATE user_events SET created_at = NOW() - INTERVAL '10 days' WHERE user_id = 'old'",
    )
    .execute(&pool)
    .await
    .unwrap();

    assert_eq!(repo.delete_older_than(7).await.unwrap(), 1);
    assert_eq!(repo.count().await.unwrap(), 1);
}
