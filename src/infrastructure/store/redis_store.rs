//! Redis-backed real-time store.

use super::service::{RealtimeStore, StoreError, StoreOp, StoreResult};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Real-time store on top of Redis.
///
/// Uses a `ConnectionManager` that reconnects on its own; cloning it is cheap
/// and every call works on its own clone.
#[derive(Clone)]
pub struct RedisStore {
    client: ConnectionManager,
}

impl RedisStore {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the URL is invalid, the connection
    /// cannot be established, or the PING fails.
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Connection(format!("Failed to create Redis client: {}", e)))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| StoreError::Connection(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self { client: manager })
    }

    fn pipeline(ops: &[StoreOp]) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in ops {
            match op {
                StoreOp::SetAdd { key, member } => {
                    pipe.sadd(key, member).ignore();
                }
                StoreOp::Expire { key, ttl } => {
                    pipe.expire(key, ttl.as_secs() as i64).ignore();
                }
                StoreOp::Incr { key } => {
                    pipe.incr(key, 1).ignore();
                }
                StoreOp::SortedSetIncr { key, member, by } => {
                    pipe.zincr(key, member, *by).ignore();
                }
                StoreOp::HashSet { key, fields } => {
                    pipe.hset_multiple(key, fields.as_slice()).ignore();
                }
            }
        }

        pipe
    }
}

fn op_error(op: &str, key: &str, e: redis::RedisError) -> StoreError {
    StoreError::Operation(format!("{} {}: {}", op, key, e))
}

#[async_trait]
impl RealtimeStore for RedisStore {
    async fn execute_batch(&self, ops: Vec<StoreOp>) -> StoreResult<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut conn = self.client.clone();
        Self::pipeline(&ops)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::Operation(format!("MULTI/EXEC batch failed: {}", e)))?;

        debug!(ops = ops.len(), "Applied atomic batch");
        Ok(())
    }

    async fn get_counter(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.client.clone();
        let value: Option<i64> = conn.get(key).await.map_err(|e| op_error("GET", key, e))?;
        Ok(value.unwrap_or(0))
    }

    async fn get_counters(&self, keys: &[String]) -> StoreResult<Vec<i64>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.client.clone();
        let values: Vec<Option<i64>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| op_error("MGET", &keys.join(","), e))?;

        Ok(values.into_iter().map(|v| v.unwrap_or(0)).collect())
    }

    async fn set_cardinality(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.client.clone();
        conn.scard(key).await.map_err(|e| op_error("SCARD", key, e))
    }

    async fn top_by_score(&self, key: &str, n: usize) -> StoreResult<Vec<(String, f64)>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.client.clone();
        conn.zrevrange_withscores(key, 0, (n - 1) as isize)
            .await
            .map_err(|e| op_error("ZREVRANGE", key, e))
    }

    async fn get_hash(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut conn = self.client.clone();
        conn.hgetall(key)
            .await
            .map_err(|e| op_error("HGETALL", key, e))
    }

    async fn get_string(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.client.clone();
        conn.get(key).await.map_err(|e| op_error("GET", key, e))
    }

    async fn set_string_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.client.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| op_error("SETEX", key, e))
    }

    async fn ping(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_is_transactional_and_keeps_op_order() {
        let ops = vec![
            StoreOp::SetAdd {
                key: "online_users".into(),
                member: "u1".into(),
            },
            StoreOp::Expire {
                key: "online_users".into(),
                ttl: Duration::from_secs(300),
            },
            StoreOp::Incr {
                key: "total_events".into(),
            },
        ];

        let packed = String::from_utf8_lossy(&RedisStore::pipeline(&ops).get_packed_pipeline())
            .into_owned();

        let multi = packed.find("MULTI").unwrap();
        let sadd = packed.find("SADD").unwrap();
        let expire = packed.find("EXPIRE").unwrap();
        let incr = packed.find("INCR").unwrap();
        let exec = packed.find("EXEC").unwrap();

        assert!(multi < sadd && sadd < expire && expire < incr && incr < exec);
    }
}
