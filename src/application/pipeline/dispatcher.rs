//! Bounded, user-sharded dispatch lanes between the queue consumer and the processor.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::stats::{PipelineEvent, PipelineStats};
use crate::domain::entities::Event;
use crate::utils::shard::shard_for;

/// Consumer of dispatched events.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: Event);
}

/// A fixed set of worker lanes, each with a bounded FIFO queue.
///
/// An event goes to lane `hash(user_id) % lanes`, so events of one user are
/// handled one after another in dispatch order while different users proceed
/// in parallel. A full lane makes [`DispatchPool::dispatch`] wait, which
/// pushes back on the partition reader instead of dropping events.
pub struct DispatchPool {
    senders: RwLock<Vec<mpsc::Sender<Event>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    lanes: usize,
    stats: Arc<PipelineStats>,
}

impl DispatchPool {
    /// Spawns `lanes` workers, each owning a queue of `capacity` events.
    pub fn start(
        handler: Arc<dyn EventHandler>,
        lanes: usize,
        capacity: usize,
        stats: Arc<PipelineStats>,
    ) -> Self {
        let lanes = lanes.max(1);
        let mut senders = Vec::with_capacity(lanes);
        let mut workers = Vec::with_capacity(lanes);

        for lane in 0..lanes {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            senders.push(tx);
            workers.push(tokio::spawn(run_lane(lane, rx, handler.clone())));
        }

        info!(lanes, capacity, "Dispatch lanes started");

        Self {
            senders: RwLock::new(senders),
            workers: Mutex::new(workers),
            lanes,
            stats,
        }
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Lane an event of `user_id` is handled on.
    pub fn lane_for(&self, user_id: &str) -> usize {
        shard_for(user_id, self.lanes)
    }

    /// Hands an event to its lane, waiting while the lane is full.
    ///
    /// Returns `false` when the pool is shut down; the event is counted as
    /// dropped.
    pub async fn dispatch(&self, event: Event) -> bool {
        let lane = self.lane_for(&event.user_id);
        let sender = self.senders.read().get(lane).cloned();

        let Some(sender) = sender else {
            self.stats.record(PipelineEvent::Dropped);
            debug!(lane, "Dispatch pool closed, dropping event");
            return false;
        };

        match sender.send(event).await {
            Ok(()) => {
                self.stats.record(PipelineEvent::Dispatched);
                true
            }
            Err(_) => {
                self.stats.record(PipelineEvent::Dropped);
                warn!(lane, "Dispatch lane closed, dropping event");
                false
            }
        }
    }

    /// Stops accepting events and waits up to `grace` for queued events to
    /// be handled. Returns `true` if every lane drained in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.senders.write().clear();
        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());

        let drain = async {
            for worker in workers {
                let _ = worker.await;
            }
        };

        match tokio::time::timeout(grace, drain).await {
            Ok(()) => {
                info!("Dispatch lanes drained");
                true
            }
            Err(_) => {
                warn!(
                    "Dispatch lanes did not drain within {}s, pending events are lost",
                    grace.as_secs()
                );
                false
            }
        }
    }
}

async fn run_lane(lane: usize, mut rx: mpsc::Receiver<Event>, handler: Arc<dyn EventHandler>) {
    while let Some(event) = rx.recv().await {
        handler.handle(event).await;
    }
    debug!(lane, "Dispatch lane stopped");
}
