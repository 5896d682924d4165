//! Partition workers feeding the dispatch lanes.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::dispatcher::DispatchPool;
use super::stats::{PipelineEvent, PipelineStats};
use crate::domain::queue::{PartitionReader, QueueError, QueueSubscription};

const TRANSIENT_ERROR_BACKOFF: Duration = Duration::from_millis(200);

/// Starts one worker per partition of `subscription`.
///
/// Each worker reads its partition strictly in order, decodes every message
/// and hands the event to `pool` without waiting for earlier events to be
/// processed. Undecodable messages are skipped. A worker ends when its
/// partition closes, on a fatal partition error, or when the pool shuts down.
///
/// # Errors
///
/// Fails when partition discovery fails or a partition cannot be opened.
pub async fn start_consumers(
    subscription: Arc<dyn QueueSubscription>,
    pool: Arc<DispatchPool>,
    stats: Arc<PipelineStats>,
) -> Result<Vec<JoinHandle<()>>, QueueError> {
    let partitions = subscription.partitions().await?;
    info!(partitions = partitions.len(), "Starting partition consumers");

    let mut handles = Vec::with_capacity(partitions.len());
    for partition in partitions {
        let reader = subscription.open(partition).await?;
        handles.push(tokio::spawn(run_partition(
            partition,
            reader,
            pool.clone(),
            stats.clone(),
        )));
    }

    Ok(handles)
}

async fn run_partition(
    partition: i32,
    mut reader: Box<dyn PartitionReader>,
    pool: Arc<DispatchPool>,
    stats: Arc<PipelineStats>,
) {
    info!(partition, "Partition consumer started");

    while let Some(next) = reader.next().await {
        match next {
            Ok(message) => match message.decode() {
                Ok(event) => {
                    debug!(
                        partition,
                        offset = message.offset,
                        user_id = %event.user_id,
                        "Received event"
                    );
                    if !pool.dispatch(event).await {
                        info!(partition, "Dispatch pool closed, stopping consumer");
                        return;
                    }
                }
                Err(e) => {
                    stats.record(PipelineEvent::DecodeFailed);
                    warn!("Skipping message: {}", e);
                }
            },
            Err(QueueError::Fatal { reason, .. }) => {
                error!(partition, "Partition consumer stopped: {}", reason);
                return;
            }
            Err(e) => {
                warn!(partition, "Consume error: {}", e);
                tokio::time::sleep(TRANSIENT_ERROR_BACKOFF).await;
            }
        }
    }

    info!(partition, "Partition closed, consumer finished");
}
