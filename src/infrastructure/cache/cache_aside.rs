//! Generic compute-if-absent cache over the real-time store.

use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::policy::CacheKey;
use crate::infrastructure::store::RealtimeStore;

/// Cache-aside wrapper used by every cached read.
///
/// All store failures are fail-open: a failed read is treated as a miss and a
/// failed write is logged and ignored, so the caller always gets the computed
/// value. Nothing is cached when `compute` fails, and there is no stampede
/// protection: concurrent misses on one key each run `compute`.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn RealtimeStore>,
}

impl CacheAside {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Returns the cached value for `key`, or computes, stores and returns it.
    ///
    /// An entry that no longer deserializes into `T` counts as a miss and is
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Only errors from `compute` are returned.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.store.get_string(key.storage_key()).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!("Cache HIT: {}", key);
                    record(key, "hit");
                    return Ok(value);
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry {}: {}", key, e);
                    record(key, "invalid");
                }
            },
            Ok(None) => {
                debug!("Cache MISS: {}", key);
                record(key, "miss");
            }
            Err(e) => {
                warn!("Cache GET error for {}: {}", key, e);
                record(key, "error");
            }
        }

        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(payload) => {
                if let Err(e) = self.store.set_string_ex(key.storage_key(), &payload, ttl).await {
                    warn!("Cache SET error for {}: {}", key, e);
                } else {
                    debug!("Cache SET: {} (TTL: {}s)", key, ttl.as_secs());
                }
            }
            Err(e) => warn!("Failed to encode cache entry {}: {}", key, e),
        }

        Ok(value)
    }
}

fn record(key: &CacheKey, result: &'static str) {
    metrics::counter!("cache_requests_total", "kind" => key.prefix(), "result" => result)
        .increment(1);
}
