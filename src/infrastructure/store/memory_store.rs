//! In-process real-time store.

use super::service::{RealtimeStore, StoreError, StoreOp, StoreResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Set(HashSet<String>),
    SortedSet(HashMap<String, f64>),
    Hash(HashMap<String, String>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "zset",
            Value::Hash(_) => "hash",
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
}

impl Inner {
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        let expired = self
            .entries
            .get(key)
            .and_then(|e| e.expires_at)
            .is_some_and(|at| at <= Instant::now());

        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get_mut(key)
    }

    fn live_value(&mut self, key: &str) -> Option<&Value> {
        self.live(key).map(|e| &e.value)
    }

    fn entry_or(&mut self, key: &str, default: Value) -> &mut Value {
        self.live(key);
        &mut self
            .entries
            .entry(key.to_string())
            .or_insert(Entry {
                value: default,
                expires_at: None,
            })
            .value
    }

    /// Applies `ops` in order; on the first failure every touched key is
    /// restored to its state before the batch.
    fn apply_all(&mut self, ops: Vec<StoreOp>) -> StoreResult<()> {
        let mut saved: Vec<(String, Option<Entry>)> = Vec::with_capacity(ops.len());
        for op in &ops {
            let key = op.key();
            if !saved.iter().any(|(k, _)| k == key) {
                saved.push((key.to_string(), self.entries.get(key).cloned()));
            }
        }

        for op in ops {
            if let Err(e) = self.apply(op) {
                for (key, entry) in saved {
                    match entry {
                        Some(entry) => self.entries.insert(key, entry),
                        None => self.entries.remove(&key),
                    };
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn apply(&mut self, op: StoreOp) -> StoreResult<()> {
        match op {
            StoreOp::SetAdd { key, member } => match self.entry_or(&key, Value::Set(HashSet::new())) {
                Value::Set(set) => {
                    set.insert(member);
                    Ok(())
                }
                other => Err(wrong_type(&key, "set", other)),
            },
            StoreOp::Expire { key, ttl } => {
                if let Some(entry) = self.live(&key) {
                    entry.expires_at = Some(Instant::now() + ttl);
                }
                Ok(())
            }
            StoreOp::Incr { key } => match self.entry_or(&key, Value::Str("0".into())) {
                Value::Str(s) => {
                    let current: i64 = s.parse().map_err(|_| {
                        StoreError::Operation(format!("value at {} is not an integer", key))
                    })?;
                    *s = (current + 1).to_string();
                    Ok(())
                }
                other => Err(wrong_type(&key, "string", other)),
            },
            StoreOp::SortedSetIncr { key, member, by } => {
                match self.entry_or(&key, Value::SortedSet(HashMap::new())) {
                    Value::SortedSet(zset) => {
                        *zset.entry(member).or_insert(0.0) += by;
                        Ok(())
                    }
                    other => Err(wrong_type(&key, "zset", other)),
                }
            }
            StoreOp::HashSet { key, fields } => {
                match self.entry_or(&key, Value::Hash(HashMap::new())) {
                    Value::Hash(hash) => {
                        hash.extend(fields);
                        Ok(())
                    }
                    other => Err(wrong_type(&key, "hash", other)),
                }
            }
        }
    }
}

fn wrong_type(key: &str, expected: &str, found: &Value) -> StoreError {
    StoreError::Operation(format!(
        "WRONGTYPE {}: expected {}, found {}",
        key,
        expected,
        found.type_name()
    ))
}

/// Real-time store kept in process memory.
///
/// Used when no Redis is configured (single-instance mode) and by tests.
/// Every operation takes the same lock, so a batch is applied atomically with
/// respect to all readers, and a failing batch leaves no partial update. Expired keys are dropped lazily on access.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        debug!("Using in-process MemoryStore");
        Self::default()
    }

    /// Simulates an outage: while unavailable every call fails and `ping` is false.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Remaining time to live of `key`, `None` when absent or persistent.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let mut inner = self.inner.lock();
        inner
            .live(key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("memory store is unavailable".into()));
        }
        Ok(())
    }
}

fn counter_value(value: Option<&Value>, key: &str) -> StoreResult<i64> {
    match value {
        None => Ok(0),
        Some(Value::Str(s)) => s
            .parse()
            .map_err(|_| StoreError::Operation(format!("value at {} is not an integer", key))),
        Some(other) => Err(wrong_type(key, "string", other)),
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn execute_batch(&self, ops: Vec<StoreOp>) -> StoreResult<()> {
        self.check()?;
        self.inner.lock().apply_all(ops)
    }

    async fn get_counter(&self, key: &str) -> StoreResult<i64> {
        self.check()?;
        let mut inner = self.inner.lock();
        counter_value(inner.live_value(key), key)
    }

    async fn get_counters(&self, keys: &[String]) -> StoreResult<Vec<i64>> {
        self.check()?;
        let mut inner = self.inner.lock();
        keys.iter()
            .map(|key| counter_value(inner.live_value(key), key))
            .collect()
    }

    async fn set_cardinality(&self, key: &str) -> StoreResult<i64> {
        self.check()?;
        let mut inner = self.inner.lock();
        match inner.live_value(key) {
            None => Ok(0),
            Some(Value::Set(set)) => Ok(set.len() as i64),
            Some(other) => Err(wrong_type(key, "set", other)),
        }
    }

    async fn top_by_score(&self, key: &str, n: usize) -> StoreResult<Vec<(String, f64)>> {
        self.check()?;
        let mut inner = self.inner.lock();
        let mut members: Vec<(String, f64)> = match inner.live_value(key) {
            None => return Ok(Vec::new()),
            Some(Value::SortedSet(zset)) => zset.iter().map(|(m, s)| (m.clone(), *s)).collect(),
            Some(other) => return Err(wrong_type(key, "zset", other)),
        };

        // Redis orders equal scores lexicographically, reversed for ZREVRANGE.
        members.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        members.truncate(n);
        Ok(members)
    }

    async fn get_hash(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.check()?;
        let mut inner = self.inner.lock();
        match inner.live_value(key) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(hash)) => Ok(hash.clone()),
            Some(other) => Err(wrong_type(key, "hash", other)),
        }
    }

    async fn get_string(&self, key: &str) -> StoreResult<Option<String>> {
        self.check()?;
        let mut inner = self.inner.lock();
        match inner.live_value(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(wrong_type(key, "string", other)),
        }
    }

    async fn set_string_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.check()?;
        self.inner.lock().entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn ping(&self) -> bool {
        self.check().is_ok()
    }
}
