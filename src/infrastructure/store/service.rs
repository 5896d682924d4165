//! Real-time store trait, batch operations and error types.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during fast-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store operation error: {0}")]
    Operation(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A single write applied as part of an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    /// Adds `member` to the set at `key`.
    SetAdd { key: String, member: String },
    /// Sets the time to live of `key`.
    Expire { key: String, ttl: Duration },
    /// Increments the integer counter at `key` by one.
    Incr { key: String },
    /// Adds `by` to the score of `member` in the sorted set at `key`.
    SortedSetIncr {
        key: String,
        member: String,
        by: f64,
    },
    /// Sets the given fields of the hash at `key`.
    HashSet {
        key: String,
        fields: Vec<(String, String)>,
    },
}

impl StoreOp {
    /// Key this operation writes to.
    pub fn key(&self) -> &str {
        match self {
            StoreOp::SetAdd { key, .. }
            | StoreOp::Expire { key, .. }
            | StoreOp::Incr { key }
            | StoreOp::SortedSetIncr { key, .. }
            | StoreOp::HashSet { key, .. } => key,
        }
    }
}

/// Fast key/value store holding the real-time counters and the read cache.
///
/// Implementations must be thread-safe. Every method maps failures to
/// [`StoreError`]; deciding whether a failure is fatal is up to the caller.
///
/// # Implementations
///
/// - [`crate::infrastructure::store::RedisStore`] - Redis via `ConnectionManager`
/// - [`crate::infrastructure::store::MemoryStore`] - in-process store for single-instance mode and tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Applies all operations as one atomic unit.
    ///
    /// Other clients never observe a partially applied batch.
    async fn execute_batch(&self, ops: Vec<StoreOp>) -> StoreResult<()>;

    /// Integer counter at `key`, 0 when absent.
    async fn get_counter(&self, key: &str) -> StoreResult<i64>;

    /// Counters for several keys in one round trip, 0 for absent keys.
    async fn get_counters(&self, keys: &[String]) -> StoreResult<Vec<i64>>;

    /// Number of members in the set at `key`.
    async fn set_cardinality(&self, key: &str) -> StoreResult<i64>;

    /// Top `n` members of the sorted set at `key`, highest score first.
    async fn top_by_score(&self, key: &str, n: usize) -> StoreResult<Vec<(String, f64)>>;

    /// All fields of the hash at `key`, empty when absent.
    async fn get_hash(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    /// String value at `key`.
    async fn get_string(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores a string value that expires after `ttl`.
    async fn set_string_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Checks if the store is reachable.
    async fn ping(&self) -> bool;
}
