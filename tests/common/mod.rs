#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::routing::get;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clickstream::api;
use clickstream::api::handlers::health_handler;
use clickstream::application::pipeline::{DispatchPool, PipelineStats, start_consumers};
use clickstream::application::services::{
    AnalyticsService, EventProcessor, IngestService, StatsService,
};
use clickstream::domain::entities::{
    DailyActiveUsers, ElementStat, Event, UserActivity, UserPathEntry, UserProfile,
};
use clickstream::domain::queue::EventQueue;
use clickstream::domain::repositories::{EventRepository, UserRepository};
use clickstream::domain::validation::FreshnessGate;
use clickstream::error::AppError;
use clickstream::infrastructure::cache::{CacheAside, CachePolicies};
use clickstream::infrastructure::queue::MemoryQueue;
use clickstream::infrastructure::store::MemoryStore;
use clickstream::state::AppState;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Event log kept in memory.
#[derive(Default)]
pub struct InMemoryEventRepository {
    rows: Mutex<Vec<(Event, DateTime<Utc>)>>,
    failing: AtomicBool,
}

impl InMemoryEventRepository {
    pub fn stored(&self) -> Vec<Event> {
        self.rows.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    /// Inserts a row as if it had been stored at `created_at`.
    pub fn insert_at(&self, event: Event, created_at: DateTime<Utc>) {
        self.rows.lock().push((event, created_at));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::unavailable("Database unavailable", json!({})));
        }
        Ok(())
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert(&self, event: &Event) -> Result<(), AppError> {
        self.check()?;
        self.rows.lock().push((event.clone(), Utc::now()));
        Ok(())
    }

    async fn recent_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<UserPathEntry>, AppError> {
        self.check()?;
        let mut entries: Vec<UserPathEntry> = self
            .rows
            .lock()
            .iter()
            .filter(|(e, _)| e.user_id == user_id)
            .map(|(e, created_at)| UserPathEntry {
                event_type: e.event_type.clone(),
                page_url: e.page_url.clone(),
                element: e.element.clone(),
                timestamp: e.timestamp,
                created_at: *created_at,
            })
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn daily_active_users(&self, days: i64) -> Result<Vec<DailyActiveUsers>, AppError> {
        self.check()?;
        let since = Utc::now() - ChronoDuration::days(days);
        let mut by_day: BTreeMap<_, HashSet<String>> = BTreeMap::new();
        for (event, created_at) in self.rows.lock().iter() {
            if *created_at >= since {
                by_day
                    .entry(created_at.date_naive())
                    .or_default()
                    .insert(event.user_id.clone());
            }
        }
        Ok(by_day
            .into_iter()
            .map(|(date, users)| DailyActiveUsers {
                date,
                users: users.len() as i64,
            })
            .collect())
    }

    async fn hot_elements(&self, limit: i64) -> Result<Vec<ElementStat>, AppError> {
        self.check()?;
        let since = Utc::now() - ChronoDuration::hours(24);
        let mut clicks: HashMap<String, i64> = HashMap::new();
        for (event, created_at) in self.rows.lock().iter() {
            if event.event_type == "click"
                && *created_at >= since
                && let Some(element) = event.element.as_deref().filter(|e| !e.is_empty())
            {
                *clicks.entry(element.to_string()).or_default() += 1;
            }
        }
        let mut elements: Vec<ElementStat> = clicks
            .into_iter()
            .map(|(element, clicks)| ElementStat { element, clicks })
            .collect();
        elements.sort_by(|a, b| b.clicks.cmp(&a.clicks).then_with(|| a.element.cmp(&b.element)));
        elements.truncate(limit.max(0) as usize);
        Ok(elements)
    }

    async fn delete_older_than(&self, days: i64) -> Result<u64, AppError> {
        self.check()?;
        let cutoff = Utc::now() - ChronoDuration::days(days);
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|(_, created_at)| *created_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.check()?;
        Ok(self.rows.lock().len() as i64)
    }
}

/// User profiles kept in memory; one lock makes the upsert atomic.
#[derive(Default)]
pub struct InMemoryUserRepository {
    profiles: Mutex<HashMap<String, UserProfile>>,
}

impl InMemoryUserRepository {
    pub fn profile(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.lock().get(user_id).cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn record_activity(&self, activity: UserActivity) -> Result<UserProfile, AppError> {
        let mut profiles = self.profiles.lock();
        let profile = profiles
            .entry(activity.user_id.clone())
            .and_modify(|p| p.record_event(activity.seen_at))
            .or_insert_with(|| {
                UserProfile::first_seen(
                    activity.user_id.clone(),
                    activity.seen_at,
                    activity.device_type.clone(),
                    activity.browser.clone(),
                )
            });
        Ok(profile.clone())
    }

    async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.profile(user_id))
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.profiles.lock().len() as i64)
    }
}

/// Fully wired in-process service.
pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryQueue>,
    pub events: Arc<InMemoryEventRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub pipeline: Arc<PipelineStats>,
    pub dispatch: Arc<DispatchPool>,
    pub consumers: Vec<JoinHandle<()>>,
}

impl TestContext {
    /// Router with every route, without the outer tower layers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .nest(
                "/api",
                api::routes::ingest_routes().merge(api::routes::read_routes()),
            )
            .with_state(self.state.clone())
    }

    /// Waits until `n` events went through the processor.
    pub async fn wait_processed(&self, n: u64) {
        let pipeline = self.pipeline.clone();
        wait_until(move || {
            let pipeline = pipeline.clone();
            async move { pipeline.snapshot().processed >= n }
        })
        .await;
    }
}

pub async fn create_test_context() -> TestContext {
    create_test_context_with(CachePolicies::default()).await
}

pub async fn create_test_context_with(policies: CachePolicies) -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new(3));
    let events = Arc::new(InMemoryEventRepository::default());
    let users = Arc::new(InMemoryUserRepository::default());
    let pipeline = Arc::new(PipelineStats::new());

    let processor = Arc::new(EventProcessor::new(
        store.clone(),
        events.clone(),
        users.clone(),
        pipeline.clone(),
    ));
    let dispatch = Arc::new(DispatchPool::start(processor.clone(), 4, 64, pipeline.clone()));
    let consumers = start_consumers(queue.clone(), dispatch.clone(), pipeline.clone())
        .await
        .unwrap();

    let publisher: Arc<dyn EventQueue> = queue.clone();
    let ingest = Arc::new(IngestService::new(
        FreshnessGate::default(),
        publisher,
        processor.clone(),
        pipeline.clone(),
    ));

    let state = AppState {
        ingest,
        stats: Arc::new(StatsService::new(store.clone(), policies)),
        analytics: Arc::new(AnalyticsService::new(
            events.clone(),
            processor,
            CacheAside::new(store.clone()),
            policies,
        )),
        store: store.clone(),
        pipeline: pipeline.clone(),
        max_batch_size: 100,
    };

    TestContext {
        state,
        store,
        queue,
        events,
        users,
        pipeline,
        dispatch,
        consumers,
    }
}

/// Polls `condition` every 10 ms for up to 5 s.
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn event_json(user_id: &str, event_type: &str, page_url: &str) -> serde_json::Value {
    json!({
        "user_id": user_id,
        "session_id": format!("{user_id}-session"),
        "event_type": event_type,
        "page_url": page_url,
        "timestamp": now_ms(),
    })
}
