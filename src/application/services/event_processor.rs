//! Real-time aggregation and durable persistence of accepted events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error};

use crate::application::pipeline::{EventHandler, PipelineEvent, PipelineStats};
use crate::domain::entities::{Event, FunnelResult, UserActivity};
use crate::domain::repositories::{EventRepository, UserRepository};
use crate::error::AppError;
use crate::infrastructure::store::{RealtimeStore, StoreOp, StoreResult, keys};
use crate::utils::user_agent;

/// Funnel counters, in step order.
const FUNNEL_COUNTERS: [&str; 4] = ["view", "click", "add_to_cart", "purchase"];

/// What [`EventProcessor::process`] managed to do for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub aggregated: bool,
    pub persisted: bool,
}

/// Applies an accepted event to the real-time store and the durable store.
///
/// Both sides run concurrently and fail independently. A failure is logged
/// and counted in [`PipelineStats`] but never returned, so neither the
/// consumer nor the fallback path has anything to retry.
pub struct EventProcessor {
    store: Arc<dyn RealtimeStore>,
    events: Arc<dyn EventRepository>,
    users: Arc<dyn UserRepository>,
    stats: Arc<PipelineStats>,
}

impl EventProcessor {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        events: Arc<dyn EventRepository>,
        users: Arc<dyn UserRepository>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            store,
            events,
            users,
            stats,
        }
    }

    /// Processes one event at the current time.
    pub async fn process(&self, event: &Event) -> ProcessOutcome {
        self.process_at(event, Utc::now()).await
    }

    /// Processes one event as if it were handled at `now`.
    pub async fn process_at(&self, event: &Event, now: DateTime<Utc>) -> ProcessOutcome {
        let (aggregated, persisted) =
            tokio::join!(self.aggregate(event, now), self.persist(event, now));

        let aggregated = match aggregated {
            Ok(()) => true,
            Err(e) => {
                self.stats.record(PipelineEvent::AggregationFailed);
                error!(user_id = %event.user_id, "Real-time aggregation failed: {}", e);
                false
            }
        };

        let persisted = match persisted {
            Ok(()) => true,
            Err(e) => {
                self.stats.record(PipelineEvent::PersistenceFailed);
                error!(user_id = %event.user_id, "Event persistence failed: {}", e);
                false
            }
        };

        self.stats.record(PipelineEvent::Processed);
        debug!(
            user_id = %event.user_id,
            event_type = %event.event_type,
            aggregated,
            persisted,
            "Event processed"
        );

        ProcessOutcome {
            aggregated,
            persisted,
        }
    }

    async fn aggregate(&self, event: &Event, now: DateTime<Utc>) -> StoreResult<()> {
        self.store.execute_batch(aggregation_batch(event, now)).await
    }

    async fn persist(&self, event: &Event, now: DateTime<Utc>) -> Result<(), AppError> {
        self.events.insert(event).await?;

        let ua = event.user_agent.as_deref().unwrap_or_default();
        self.users
            .record_activity(UserActivity {
                user_id: event.user_id.clone(),
                seen_at: now,
                device_type: user_agent::device_type(ua).map(str::to_string),
                browser: user_agent::browser(ua).map(str::to_string),
            })
            .await?;

        Ok(())
    }

    /// Conversion funnel from the current per-type counters.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] when the real-time store cannot be read.
    pub async fn calculate_funnel(&self) -> Result<FunnelResult, AppError> {
        let keys: Vec<String> = FUNNEL_COUNTERS
            .iter()
            .map(|t| keys::events_of_type(t))
            .collect();

        let counts = self.store.get_counters(&keys).await?;
        let count = |i: usize| counts.get(i).copied().unwrap_or(0);

        Ok(FunnelResult::from_counts(count(0), count(1), count(2), count(3)))
    }
}

#[async_trait]
impl EventHandler for EventProcessor {
    async fn handle(&self, event: Event) {
        self.process(&event).await;
    }
}

/// Every real-time store update for one event, in application order.
///
/// The batch is applied atomically; `now` drives the session activity stamp
/// and the hourly counter.
pub fn aggregation_batch(event: &Event, now: DateTime<Utc>) -> Vec<StoreOp> {
    let mut ops = vec![
        StoreOp::SetAdd {
            key: keys::ONLINE_USERS.to_string(),
            member: event.user_id.clone(),
        },
        StoreOp::Expire {
            key: keys::ONLINE_USERS.to_string(),
            ttl: keys::ONLINE_USERS_TTL,
        },
        StoreOp::Incr {
            key: keys::TOTAL_EVENTS.to_string(),
        },
        StoreOp::Incr {
            key: keys::events_of_type(&event.event_type),
        },
    ];

    if event.kind().is_some_and(|k| k.counts_toward_page_score()) {
        ops.push(StoreOp::SortedSetIncr {
            key: keys::HOT_PAGES.to_string(),
            member: event.page_url.clone(),
            by: 1.0,
        });
    }

    let session = keys::session(&event.session_id);
    ops.push(StoreOp::HashSet {
        key: session.clone(),
        fields: vec![
            ("user_id".to_string(), event.user_id.clone()),
            ("last_activity".to_string(), now.timestamp().to_string()),
            ("page_url".to_string(), event.page_url.clone()),
        ],
    });
    ops.push(StoreOp::Expire {
        key: session,
        ttl: keys::SESSION_TTL,
    });

    let hourly = keys::hourly_events(now);
    ops.push(StoreOp::Incr {
        key: hourly.clone(),
    });
    ops.push(StoreOp::Expire {
        key: hourly,
        ttl: keys::HOURLY_COUNTER_TTL,
    });

    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::UserProfile;
    use crate::domain::repositories::{MockEventRepository, MockUserRepository};
    use crate::infrastructure::store::{MemoryStore, MockRealtimeStore, StoreError};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap()
    }

    fn ok_repos() -> (MockEventRepository, MockUserRepository) {
        let mut events = MockEventRepository::new();
        events.expect_insert().returning(|_| Ok(()));
        let mut users = MockUserRepository::new();
        users
            .expect_record_activity()
            .returning(|a| Ok(UserProfile::first_seen(a.user_id, a.seen_at, None, None)));
        (events, users)
    }

    fn processor(
        store: Arc<dyn RealtimeStore>,
        events: MockEventRepository,
        users: MockUserRepository,
    ) -> (EventProcessor, Arc<PipelineStats>) {
        let stats = Arc::new(PipelineStats::new());
        (
            EventProcessor::new(store, Arc::new(events), Arc::new(users), stats.clone()),
            stats,
        )
    }

    #[test]
    fn test_batch_skips_hot_pages_for_other_types() {
        let view = aggregation_batch(&Event::new("u", "s", "view", "/p", 1), now());
        let scroll = aggregation_batch(&Event::new("u", "s", "scroll", "/p", 1), now());

        let has_zincr = |ops: &[StoreOp]| {
            ops.iter()
                .any(|op| matches!(op, StoreOp::SortedSetIncr { .. }))
        };
        assert!(has_zincr(&view));
        assert!(!has_zincr(&scroll));
        assert_eq!(view.len(), scroll.len() + 1);
    }

    #[test]
    fn test_batch_writes_session_and_hourly_keys() {
        let ops = aggregation_batch(&Event::new("u1", "sess-9", "click", "/cart", 1), now());

        let session = ops
            .iter()
            .find_map(|op| match op {
                StoreOp::HashSet { key, fields } if key == "session:sess-9" => Some(fields),
                _ => None,
            })
            .unwrap();
        assert!(session.contains(&("last_activity".to_string(), now().timestamp().to_string())));
        assert!(ops.iter().any(|op| op.key() == "events:hour:2024050114"));
    }

    #[tokio::test]
    async fn test_process_updates_realtime_counters() {
        let store = Arc::new(MemoryStore::new());
        let (events, users) = ok_repos();
        let (processor, stats) = processor(store.clone(), events, users);

        processor
            .process_at(&Event::new("u1", "s1", "view", "/home", 1), now())
            .await;
        processor
            .process_at(&Event::new("u2", "s2", "click", "/home", 2), now())
            .await;

        assert_eq!(store.get_counter("total_events").await.unwrap(), 2);
        assert_eq!(store.get_counter("events:view").await.unwrap(), 1);
        assert_eq!(store.set_cardinality("online_users").await.unwrap(), 2);
        assert_eq!(
            store.top_by_score("hot_pages", 1).await.unwrap(),
            vec![("/home".to_string(), 2.0)]
        );
        assert_eq!(stats.snapshot().processed, 2);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_block_persistence() {
        let mut store = MockRealtimeStore::new();
        store
            .expect_execute_batch()
            .returning(|_| Err(StoreError::Connection("down".into())));
        let (events, users) = ok_repos();
        let (processor, stats) = processor(Arc::new(store), events, users);

        let outcome = processor
            .process_at(&Event::new("u1", "s1", "view", "/", 1), now())
            .await;

        assert_eq!(
            outcome,
            ProcessOutcome {
                aggregated: false,
                persisted: true
            }
        );
        assert_eq!(stats.snapshot().aggregation_failed, 1);
    }

    #[tokio::test]
    async fn test_insert_failure_skips_profile_update() {
        let mut events = MockEventRepository::new();
        events
            .expect_insert()
            .returning(|_| Err(AppError::unavailable("db down", serde_json::json!({}))));
        let mut users = MockUserRepository::new();
        users.expect_record_activity().never();

        let (processor, stats) = processor(Arc::new(MemoryStore::new()), events, users);
        let outcome = processor
            .process_at(&Event::new("u1", "s1", "view", "/", 1), now())
            .await;

        assert!(outcome.aggregated);
        assert!(!outcome.persisted);
        assert_eq!(stats.snapshot().persistence_failed, 1);
    }

    #[tokio::test]
    async fn test_profile_gets_device_and_browser() {
        let (mut events, mut users) = (MockEventRepository::new(), MockUserRepository::new());
        events.expect_insert().returning(|_| Ok(()));
        users
            .expect_record_activity()
            .withf(|a| {
                a.device_type.as_deref() == Some("mobile") && a.browser.as_deref() == Some("Safari")
            })
            .times(1)
            .returning(|a| {
                Ok(UserProfile::first_seen(
                    a.user_id,
                    a.seen_at,
                    a.device_type,
                    a.browser,
                ))
            });

        let (processor, _) = processor(Arc::new(MemoryStore::new()), events, users);
        let mut event = Event::new("u1", "s1", "view", "/", 1);
        event.user_agent = Some(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1"
                .to_string(),
        );

        assert!(processor.process_at(&event, now()).await.persisted);
    }

    #[tokio::test]
    async fn test_funnel_from_counters() {
        let store = Arc::new(MemoryStore::new());
        let incr = |key: &str, times: usize| {
            (0..times)
                .map(|_| StoreOp::Incr { key: key.to_string() })
                .collect::<Vec<_>>()
        };
        let mut ops = incr("events:view", 100);
        ops.extend(incr("events:click", 40));
        ops.extend(incr("events:add_to_cart", 10));
        ops.extend(incr("events:purchase", 2));
        store.execute_batch(ops).await.unwrap();

        let (events, users) = ok_repos();
        let (processor, _) = processor(store, events, users);
        let funnel = processor.calculate_funnel().await.unwrap();

        let steps: Vec<(i64, f64)> = funnel
            .steps
            .iter()
            .map(|s| (s.user_count, s.conversion_rate_pct))
            .collect();
        assert_eq!(steps, vec![(100, 100.0), (40, 40.0), (10, 10.0), (2, 2.0)]);
        assert_eq!(funnel.total_users, 100);
        assert_eq!(funnel.overall_conversion_rate_pct, 2.0);
    }

    #[tokio::test]
    async fn test_funnel_without_views_is_zero() {
        let (events, users) = ok_repos();
        let (processor, _) = processor(Arc::new(MemoryStore::new()), events, users);

        let funnel = processor.calculate_funnel().await.unwrap();

        assert_eq!(funnel.total_users, 0);
        assert!(funnel.steps[1..].iter().all(|s| s.conversion_rate_pct == 0.0));
        assert_eq!(funnel.overall_conversion_rate_pct, 0.0);
    }
}
