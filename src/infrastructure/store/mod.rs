//! Fast store for real-time counters and the read-side cache.
//!
//! Provides a [`RealtimeStore`] trait with two implementations:
//! - [`RedisStore`] - Production Redis-backed store
//! - [`MemoryStore`] - In-process store for single-instance mode and tests

pub mod keys;
mod memory_store;
mod redis_store;
mod service;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
pub use service::{RealtimeStore, StoreError, StoreOp, StoreResult};

#[cfg(test)]
pub use service::MockRealtimeStore;
