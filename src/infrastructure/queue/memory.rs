//! In-process partitioned queue.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::entities::Event;
use crate::domain::queue::{
    EventQueue, PartitionReader, PublishReceipt, QueueError, QueueMessage, QueueSubscription,
};
use crate::utils::shard::shard_for;

struct Partition {
    sender: RwLock<Option<mpsc::UnboundedSender<QueueMessage>>>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<QueueMessage>>>,
    next_offset: AtomicI64,
}

/// Partitioned queue kept in process memory.
///
/// Stands in for Kafka when no brokers are configured and in tests. Events
/// are routed to a partition by `user_id`, each partition is FIFO, and each
/// partition can be opened by exactly one reader. Nothing survives a restart.
pub struct MemoryQueue {
    partitions: Vec<Partition>,
    unavailable: AtomicBool,
}

impl MemoryQueue {
    pub fn new(partitions: usize) -> Self {
        let partitions = (0..partitions.max(1))
            .map(|_| {
                let (tx, rx) = mpsc::unbounded_channel();
                Partition {
                    sender: RwLock::new(Some(tx)),
                    receiver: Mutex::new(Some(rx)),
                    next_offset: AtomicI64::new(0),
                }
            })
            .collect();

        debug!("Using in-process MemoryQueue");
        Self {
            partitions,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Partition an event for `user_id` is routed to.
    pub fn partition_for(&self, user_id: &str) -> i32 {
        shard_for(user_id, self.partitions.len()) as i32
    }

    /// Simulates a broker outage: while unavailable every publish fails.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Closes all partitions; readers drain what is queued and then end.
    pub fn close(&self) {
        for partition in &self.partitions {
            partition.sender.write().take();
        }
    }
}

#[async_trait]
impl EventQueue for MemoryQueue {
    async fn publish(&self, event: &Event) -> Result<PublishReceipt, QueueError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::Publish("queue is unavailable".into()));
        }

        let payload = serde_json::to_vec(event)
            .map_err(|e| QueueError::Publish(format!("Failed to encode event: {}", e)))?;

        let index = self.partition_for(&event.user_id);
        let partition = &self.partitions[index as usize];

        let guard = partition.sender.read();
        let sender = guard
            .as_ref()
            .ok_or_else(|| QueueError::Publish("queue is closed".into()))?;

        let offset = partition.next_offset.fetch_add(1, Ordering::SeqCst);
        sender
            .send(QueueMessage {
                partition: index,
                offset,
                payload,
            })
            .map_err(|_| QueueError::Publish(format!("partition {} has no reader", index)))?;

        Ok(PublishReceipt {
            partition: index,
            offset,
        })
    }
}

#[async_trait]
impl QueueSubscription for MemoryQueue {
    async fn partitions(&self) -> Result<Vec<i32>, QueueError> {
        Ok((0..self.partitions.len() as i32).collect())
    }

    async fn open(&self, partition: i32) -> Result<Box<dyn PartitionReader>, QueueError> {
        let fatal = |reason: &str| QueueError::Fatal {
            partition,
            reason: reason.to_string(),
        };

        let slot = usize::try_from(partition)
            .ok()
            .and_then(|i| self.partitions.get(i))
            .ok_or_else(|| fatal("unknown partition"))?;

        let receiver = slot
            .receiver
            .lock()
            .take()
            .ok_or_else(|| fatal("partition is already open"))?;

        Ok(Box::new(MemoryPartitionReader { receiver }))
    }
}

struct MemoryPartitionReader {
    receiver: mpsc::UnboundedReceiver<QueueMessage>,
}

#[async_trait]
impl PartitionReader for MemoryPartitionReader {
    async fn next(&mut self) -> Option<Result<QueueMessage, QueueError>> {
        self.receiver.recv().await.map(Ok)
    }
}
