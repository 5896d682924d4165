//! In-process pipeline counters mirrored to the `metrics` facade.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// A countable pipeline outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    Received,
    Rejected(&'static str),
    Queued,
    Fallback,
    Dispatched,
    Processed,
    AggregationFailed,
    PersistenceFailed,
    DecodeFailed,
    Dropped,
}

/// Counters for every stage of the event pipeline.
///
/// Each increment also feeds the matching `metrics` counter, so an installed
/// recorder sees the same numbers that `/health` reports.
#[derive(Debug, Default)]
pub struct PipelineStats {
    received: AtomicU64,
    rejected: AtomicU64,
    queued: AtomicU64,
    fallback: AtomicU64,
    dispatched: AtomicU64,
    processed: AtomicU64,
    aggregation_failed: AtomicU64,
    persistence_failed: AtomicU64,
    decode_failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSnapshot {
    pub received: u64,
    pub rejected: u64,
    pub queued: u64,
    pub fallback: u64,
    pub dispatched: u64,
    pub processed: u64,
    pub aggregation_failed: u64,
    pub persistence_failed: u64,
    pub decode_failed: u64,
    pub dropped: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: PipelineEvent) {
        let (slot, name) = match event {
            PipelineEvent::Received => (&self.received, "events_received_total"),
            PipelineEvent::Rejected(reason) => {
                metrics::counter!("events_rejected_total", "reason" => reason).increment(1);
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return;
            }
            PipelineEvent::Queued => (&self.queued, "events_queued_total"),
            PipelineEvent::Fallback => (&self.fallback, "events_fallback_total"),
            PipelineEvent::Dispatched => (&self.dispatched, "events_dispatched_total"),
            PipelineEvent::Processed => (&self.processed, "events_processed_total"),
            PipelineEvent::AggregationFailed => {
                (&self.aggregation_failed, "aggregation_failures_total")
            }
            PipelineEvent::PersistenceFailed => {
                (&self.persistence_failed, "persistence_failures_total")
            }
            PipelineEvent::DecodeFailed => (&self.decode_failed, "queue_decode_failures_total"),
            PipelineEvent::Dropped => (&self.dropped, "dispatch_dropped_total"),
        };

        slot.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(name).increment(1);
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        PipelineSnapshot {
            received: load(&self.received),
            rejected: load(&self.rejected),
            queued: load(&self.queued),
            fallback: load(&self.fallback),
            dispatched: load(&self.dispatched),
            processed: load(&self.processed),
            aggregation_failed: load(&self.aggregation_failed),
            persistence_failed: load(&self.persistence_failed),
            decode_failed: load(&self.decode_failed),
            dropped: load(&self.dropped),
        }
    }
}
