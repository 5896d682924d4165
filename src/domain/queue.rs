//! Queue abstraction between the ingest boundary and the processing pipeline.
//!
//! The producer side ([`EventQueue`]) and the consumer side
//! ([`QueueSubscription`] / [`PartitionReader`]) are separate traits so the
//! HTTP layer never sees consumer types and the consumer never sees producer
//! types.
//!
//! # Implementations
//!
//! - [`crate::infrastructure::queue::KafkaEventQueue`] / [`crate::infrastructure::queue::KafkaSubscription`]
//! - [`crate::infrastructure::queue::MemoryQueue`] - in-process partitioned queue

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::entities::Event;

/// Errors raised by queue producers and consumers.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("publish failed: {0}")]
    Publish(String),

    #[error("consume failed: {0}")]
    Consume(String),

    #[error("undecodable message at partition {partition} offset {offset}: {reason}")]
    Decode {
        partition: i32,
        offset: i64,
        reason: String,
    },

    /// The partition can no longer be read; the worker must stop.
    #[error("partition {partition} is unusable: {reason}")]
    Fatal { partition: i32, reason: String },
}

/// Where a published event landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReceipt {
    pub partition: i32,
    pub offset: i64,
}

/// A raw message read from one partition.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

impl QueueMessage {
    /// Decodes the JSON payload into an [`Event`].
    pub fn decode(&self) -> Result<Event, QueueError> {
        serde_json::from_slice(&self.payload).map_err(|e| QueueError::Decode {
            partition: self.partition,
            offset: self.offset,
            reason: e.to_string(),
        })
    }
}

/// Producer side: durable, partitioned publish keyed by `user_id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Publishes one event.
    ///
    /// The partition key is the event's `user_id`, so all events of a user
    /// land on the same partition in publish order.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Publish`] when the broker rejects or times out.
    async fn publish(&self, event: &Event) -> Result<PublishReceipt, QueueError>;

    /// Waits for in-flight messages to be delivered.
    async fn flush(&self, _timeout: Duration) -> Result<(), QueueError> {
        Ok(())
    }
}

/// Consumer side: partition discovery and per-partition readers.
#[async_trait]
pub trait QueueSubscription: Send + Sync {
    /// Partition ids of the subscribed topic.
    async fn partitions(&self) -> Result<Vec<i32>, QueueError>;

    /// Opens an ordered reader over one partition.
    async fn open(&self, partition: i32) -> Result<Box<dyn PartitionReader>, QueueError>;
}

/// Ordered stream of messages from a single partition.
#[async_trait]
pub trait PartitionReader: Send {
    /// Next message in partition order.
    ///
    /// `None` means the partition is closed and the reader will yield nothing
    /// more.
    async fn next(&mut self) -> Option<Result<QueueMessage, QueueError>>;
}
