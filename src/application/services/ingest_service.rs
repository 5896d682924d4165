//! Ingest boundary: validation, freshness gate, queue publish and fallback.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use super::event_processor::EventProcessor;
use crate::application::pipeline::{PipelineEvent, PipelineStats};
use crate::domain::entities::Event;
use crate::domain::queue::EventQueue;
use crate::domain::validation::{EventValidator, FreshnessGate};
use crate::error::AppError;

/// Per-batch outcome of [`IngestService::ingest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub received: usize,
    /// Events that were queued or processed through the fallback path.
    pub accepted: usize,
    pub rejected: usize,
    pub stale: usize,
    /// Accepted events that were processed synchronously after a publish error.
    pub fallback: usize,
}

/// Accepts event batches from the HTTP layer.
///
/// Each event is validated, checked for freshness and published to the
/// queue. An event that cannot be published is processed directly instead
/// of being dropped; such events do not keep per-user ordering with the
/// queued ones.
pub struct IngestService {
    validator: EventValidator,
    freshness: FreshnessGate,
    queue: Arc<dyn EventQueue>,
    processor: Arc<EventProcessor>,
    stats: Arc<PipelineStats>,
    closed: AtomicBool,
}

impl IngestService {
    pub fn new(
        freshness: FreshnessGate,
        queue: Arc<dyn EventQueue>,
        processor: Arc<EventProcessor>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            validator: EventValidator::new(),
            freshness,
            queue,
            processor,
            stats,
            closed: AtomicBool::new(false),
        }
    }

    /// Runs a batch through the ingest pipeline.
    ///
    /// Individual events never fail the batch: rejected and stale events are
    /// logged and counted, publish errors fall back to direct processing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] once [`IngestService::close`] has been
    /// called.
    pub async fn ingest(
        &self,
        events: Vec<Event>,
        now: DateTime<Utc>,
    ) -> Result<IngestSummary, AppError> {
        if self.is_closed() {
            return Err(AppError::unavailable(
                "Service is shutting down",
                json!({ "retry": true }),
            ));
        }

        let mut summary = IngestSummary {
            received: events.len(),
            ..Default::default()
        };

        for event in events {
            self.stats.record(PipelineEvent::Received);

            if let Err(e) = self.validator.validate(&event) {
                self.stats.record(PipelineEvent::Rejected(e.reason()));
                warn!(user_id = %event.user_id, reason = e.reason(), "Rejected event: {}", e);
                summary.rejected += 1;
                continue;
            }

            if let Err(stale) = self.freshness.check(&event, now) {
                self.stats.record(PipelineEvent::Rejected("stale"));
                debug!(
                    user_id = %event.user_id,
                    age_seconds = stale.age_seconds,
                    "Dropped stale event"
                );
                summary.stale += 1;
                continue;
            }

            match self.queue.publish(&event).await {
                Ok(receipt) => {
                    self.stats.record(PipelineEvent::Queued);
                    debug!(
                        user_id = %event.user_id,
                        partition = receipt.partition,
                        offset = receipt.offset,
                        "Event queued"
                    );
                }
                Err(e) => {
                    self.stats.record(PipelineEvent::Fallback);
                    warn!(user_id = %event.user_id, "Publish failed, processing directly: {}", e);
                    self.processor.process(&event).await;
                    summary.fallback += 1;
                }
            }
            summary.accepted += 1;
        }

        Ok(summary)
    }

    /// Stops accepting new batches.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Ingest closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
