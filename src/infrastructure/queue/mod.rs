//! Event queue implementations.
//!
//! - [`KafkaEventQueue`] / [`KafkaSubscription`] - Kafka producer and per-partition consumers
//! - [`MemoryQueue`] - in-process partitioned queue for single-instance mode and tests

mod kafka;
mod memory;

pub use kafka::{KafkaEventQueue, KafkaSettings, KafkaSubscription};
pub use memory::MemoryQueue;
