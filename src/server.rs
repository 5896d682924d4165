//! Service initialization and runtime lifecycle.
//!
//! Wires the durable store, the real-time store, the queue, the processing
//! pipeline and the Axum server, and tears them down in order on shutdown.

use crate::api::middleware::rate_limit::RateLimit;
use crate::application::pipeline::{DispatchPool, PipelineStats, start_consumers};
use crate::application::services::{
    AnalyticsService, EventProcessor, IngestService, StatsService,
};
use crate::config::Config;
use crate::domain::queue::{EventQueue, QueueSubscription};
use crate::domain::repositories::{EventRepository, UserRepository};
use crate::domain::validation::FreshnessGate;
use crate::infrastructure::cache::CacheAside;
use crate::infrastructure::persistence::{PgEventRepository, PgUserRepository};
use crate::infrastructure::queue::{
    KafkaEventQueue, KafkaSettings, KafkaSubscription, MemoryQueue,
};
use crate::infrastructure::store::{MemoryStore, RealtimeStore, RedisStore};
use crate::routes::{RouterOptions, app_router};
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{error, info, warn};

const DB_CONNECT_ATTEMPTS: usize = 5;

/// Queue producer and consumer sides, either Kafka or in-process.
struct QueueWiring {
    publisher: Arc<dyn EventQueue>,
    subscription: Arc<dyn QueueSubscription>,
}

/// Runs the service with the given configuration until a shutdown signal.
///
/// Startup order:
/// - PostgreSQL pool (with retry) and bundled migrations
/// - Real-time store (Redis, or in-process fallback)
/// - Queue (Kafka, or in-process fallback)
/// - Processor, dispatch lanes and partition consumers
/// - Axum HTTP server
///
/// # Errors
///
/// Returns an error if the database is unreachable, migrations fail, the
/// queue cannot be set up, or the listener cannot bind.
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to apply migrations")?;
    info!("Migrations applied");

    let store = connect_store(&config).await;
    let queue = connect_queue(&config)?;

    let pool_arc = Arc::new(pool.clone());
    let events: Arc<dyn EventRepository> = Arc::new(PgEventRepository::new(pool_arc.clone()));
    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool_arc));

    let pipeline = Arc::new(PipelineStats::new());
    let processor = Arc::new(EventProcessor::new(
        store.clone(),
        events.clone(),
        users,
        pipeline.clone(),
    ));

    let dispatch = Arc::new(DispatchPool::start(
        processor.clone(),
        config.dispatch_lanes,
        config.dispatch_lane_capacity,
        pipeline.clone(),
    ));
    let consumers = start_consumers(queue.subscription.clone(), dispatch.clone(), pipeline.clone())
        .await
        .context("Failed to start queue consumers")?;

    let ingest = Arc::new(IngestService::new(
        FreshnessGate::new(config.max_event_age_seconds),
        queue.publisher.clone(),
        processor.clone(),
        pipeline.clone(),
    ));

    let state = AppState {
        ingest: ingest.clone(),
        stats: Arc::new(StatsService::new(store.clone(), config.cache)),
        analytics: Arc::new(AnalyticsService::new(
            events,
            processor,
            CacheAside::new(store.clone()),
            config.cache,
        )),
        store,
        pipeline: pipeline.clone(),
        max_batch_size: config.max_batch_size,
    };

    let app = app_router(
        state,
        RouterOptions {
            request_timeout: config.request_timeout(),
            rate_limit: RateLimit::new(config.rate_limit_per_second, config.rate_limit_burst),
            behind_proxy: config.behind_proxy,
        },
    );

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");

    let shutdown_ingest = ingest.clone();
    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, closing ingest");
        shutdown_ingest.close();
    })
    .await?;

    info!("HTTP server stopped");

    for consumer in &consumers {
        consumer.abort();
    }

    let grace = config.shutdown_grace();
    dispatch.shutdown(grace).await;

    if let Err(e) = queue.publisher.flush(grace).await {
        warn!("Producer flush failed: {}", e);
    }

    pool.close().await;
    info!(snapshot = ?pipeline.snapshot(), "Shutdown complete");

    Ok(())
}

async fn connect_database(config: &Config) -> Result<PgPool> {
    let options = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime));

    let strategy = ExponentialBackoff::from_millis(200)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(DB_CONNECT_ATTEMPTS);

    let pool = Retry::spawn(strategy, || {
        let options = options.clone();
        async move {
            options.connect(&config.database_url).await.inspect_err(|e| {
                warn!("Database connection attempt failed: {}", e);
            })
        }
    })
    .await
    .context("Failed to connect to database")?;

    info!("Connected to database");
    Ok(pool)
}

async fn connect_store(config: &Config) -> Arc<dyn RealtimeStore> {
    let Some(redis_url) = &config.redis_url else {
        warn!("REDIS_URL not set, real-time counters live in process memory");
        return Arc::new(MemoryStore::new());
    };

    match RedisStore::connect(redis_url).await {
        Ok(redis) => Arc::new(redis),
        Err(e) => {
            error!("Failed to connect to Redis: {}. Using in-process store.", e);
            Arc::new(MemoryStore::new())
        }
    }
}

fn connect_queue(config: &Config) -> Result<QueueWiring> {
    let Some(brokers) = &config.kafka_brokers else {
        warn!(
            partitions = config.queue_partitions,
            "KAFKA_BROKERS not set, using in-process queue"
        );
        let queue = Arc::new(MemoryQueue::new(config.queue_partitions));
        return Ok(QueueWiring {
            publisher: queue.clone(),
            subscription: queue,
        });
    };

    let settings = KafkaSettings {
        brokers: brokers.clone(),
        topic: config.kafka_topic.clone(),
        group_id: config.kafka_group_id.clone(),
        publish_timeout: Duration::from_secs(5),
    };

    let producer = KafkaEventQueue::new(&settings).context("Failed to create Kafka producer")?;

    Ok(QueueWiring {
        publisher: Arc::new(producer),
        subscription: Arc::new(KafkaSubscription::new(settings)),
    })
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
