mod common;

use axum_test::TestServer;
use chrono::{Duration, Utc};
use clickstream::domain::entities::Event;
use common::{TestContext, create_test_context, event_json, now_ms};
use serde_json::{Value, json};

async fn ingest(server: &TestServer, ctx: &TestContext, events: Vec<Value>) {
    let expected = ctx.pipeline.snapshot().processed + events.len() as u64;
    server
        .post("/api/events")
        .json(&json!({ "events": events }))
        .await
        .assert_status_ok();
    ctx.wait_processed(expected).await;
}

fn click(user_id: &str, element: &str, timestamp: i64) -> Value {
    json!({
        "user_id": user_id,
        "session_id": "s1",
        "event_type": "click",
        "page_url": "/shop",
        "element": element,
        "timestamp": timestamp,
    })
}

#[tokio::test]
async fn test_user_events_newest_first() {
    let ctx = create_test_context().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let base = now_ms();
    ingest(
        &server,
        &ctx,
        vec![
            click("alice", "#a", base),
            click("alice", "#b", base + 1),
            click("alice", "#c", base + 2),
            click("bob", "#a", base),
        ],
    )
    .await;

    let response = server
        .get("/api/user/alice/events")
        .add_query_param("limit", 2)
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["user_id"], "alice");
    assert_eq!(body["count"], 2);
    assert_eq!(body["events"][0]["element"], "#c");
    assert_eq!(body["events"][1]["element"], "#b");
}

#[tokio::test]
async fn test_user_events_limit_bounds() {
    let ctx = create_test_context().await;
    let server = TestServer::new(ctx.router()).unwrap();

    server
        .get("/api/user/alice/events")
        .add_query_param("limit", 1001)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_funnel_analysis() {
    let ctx = create_test_context().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let mut events: Vec<Value> = (0..4)
        .map(|i| event_json(&format!("u{i}"), "view", "/product"))
        .collect();
    events.push(event_json("u0", "click", "/product"));
    events.push(event_json("u1", "click", "/product"));
    events.push(event_json("u0", "purchase", "/checkout"));
    ingest(&server, &ctx, events).await;

    let response = server.get("/api/funnel/checkout/analysis").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["funnel_id"], "checkout");
    assert_eq!(body["total_users"], 4);
    assert_eq!(body["conversion_rate"], 25.0);
    assert!(body["cache_key"].as_str().unwrap().starts_with("funnel_checkout_"));

    let steps = body["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[0], json!({ "step": "Page view", "users": 4, "conversion_rate": 100.0 }));
    assert_eq!(steps[1]["users"], 2);
    assert_eq!(steps[1]["conversion_rate"], 50.0);
    assert_eq!(steps[2]["users"], 0);
    assert_eq!(steps[3]["users"], 1);
}

#[tokio::test]
async fn test_funnel_without_views_has_zero_rates() {
    let ctx = create_test_context().await;
    let server = TestServer::new(ctx.router()).unwrap();

    let body = server.get("/api/funnel/empty/analysis").await.json::<Value>();

    assert_eq!(body["total_users"], 0);
    assert_eq!(body["conversion_rate"], 0.0);
    assert_eq!(body["steps"][3]["conversion_rate"], 0.0);
}

#[tokio::test]
async fn test_retention_counts_distinct_users_per_day() {
    let ctx = create_test_context().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let now = Utc::now();
    let yesterday = now - Duration::days(1);
    let event = |user: &str| Event::new(user, "s", "view", "/", now.timestamp_millis());

    ctx.events.insert_at(event("u1"), yesterday);
    ctx.events.insert_at(event("u2"), yesterday);
    ctx.events.insert_at(event("u1"), now);
    ctx.events.insert_at(event("u1"), now);
    ctx.events.insert_at(event("u3"), now - Duration::days(30));

    let response = server
        .get("/api/analytics/retention")
        .add_query_param("days", 7)
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["days"], 7);
    let days = body["daily_active_users"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["users"], 2);
    assert_eq!(days[1]["users"], 1);
}

#[tokio::test]
async fn test_retention_days_bounds() {
    let ctx = create_test_context().await;
    let server = TestServer::new(ctx.router()).unwrap();

    server
        .get("/api/analytics/retention")
        .add_query_param("days", 91)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_hot_elements() {
    let ctx = create_test_context().await;
    let server = TestServer::new(ctx.router()).unwrap();
    let ts = now_ms();
    ingest(
        &server,
        &ctx,
        vec![
            click("u1", "#buy", ts),
            click("u2", "#buy", ts),
            click("u3", "#menu", ts),
            click("u3", "", ts),
        ],
    )
    .await;

    let response = server
        .get("/api/analytics/hot-elements")
        .add_query_param("limit", 10)
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["elements"],
        json!([
            { "element": "#buy", "clicks": 2 },
            { "element": "#menu", "clicks": 1 },
        ])
    );
}
