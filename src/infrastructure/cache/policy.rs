//! Cache keys, time buckets and per-query cache policies.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Namespace of read-cache entries in the real-time store.
///
/// Keeps a cache entry from ever landing on a live counter key such as
/// `online_users`.
pub const CACHE_NAMESPACE: &str = "cache:";

/// A read-cache key: a query prefix plus `_`-joined parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    prefix: &'static str,
    full: String,
    stored: String,
}

impl CacheKey {
    /// `prefix + "_" + join(params, "_")`, or just `prefix` without params.
    pub fn new<I, S>(prefix: &'static str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut full = prefix.to_string();
        for param in params {
            full.push('_');
            full.push_str(param.as_ref());
        }
        let stored = format!("{CACHE_NAMESPACE}{full}");
        Self {
            prefix,
            full,
            stored,
        }
    }

    /// Query kind, used as a metrics label.
    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// Key the entry is stored under, `cache:` + [`Self::as_str`].
    pub fn storage_key(&self) -> &str {
        &self.stored
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Label of the time bucket of width `width` that contains `now`.
///
/// Buckets are aligned to the Unix epoch, so all instants inside one bucket
/// produce the same label and the label changes exactly at the boundary.
pub fn bucket_label(now: DateTime<Utc>, width: Duration) -> String {
    let width = width.as_secs().max(1) as i64;
    let ts = now.timestamp();
    let start = ts - ts.rem_euclid(width);

    match DateTime::from_timestamp(start, 0) {
        Some(at) => at.format("%Y%m%d%H%M").to_string(),
        None => start.to_string(),
    }
}

/// How long a query result is cached and how its key is bucketed in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    /// Width of the time bucket appended to the key; `None` for no bucket.
    pub bucket: Option<Duration>,
}

impl CachePolicy {
    pub const fn new(ttl: Duration, bucket: Option<Duration>) -> Self {
        Self { ttl, bucket }
    }

    /// Builds the key for `params`, appending the current bucket label if any.
    pub fn key(&self, prefix: &'static str, params: &[&str], now: DateTime<Utc>) -> CacheKey {
        let mut parts: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        if let Some(width) = self.bucket {
            parts.push(bucket_label(now, width));
        }
        CacheKey::new(prefix, parts)
    }
}

const fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

/// Cache policy of every cached read query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicies {
    pub online_users: CachePolicy,
    pub conversion_rate: CachePolicy,
    pub event_stats: CachePolicy,
    pub dashboard: CachePolicy,
    pub hot_pages: CachePolicy,
    pub funnel: CachePolicy,
    pub user_events: CachePolicy,
    pub retention: CachePolicy,
    pub hot_elements: CachePolicy,
}

impl Default for CachePolicies {
    fn default() -> Self {
        Self {
            online_users: CachePolicy::new(Duration::from_secs(30), Some(minutes(1))),
            conversion_rate: CachePolicy::new(minutes(5), Some(minutes(1))),
            event_stats: CachePolicy::new(minutes(5), Some(minutes(1))),
            dashboard: CachePolicy::new(minutes(5), Some(minutes(60))),
            hot_pages: CachePolicy::new(minutes(10), Some(minutes(10))),
            funnel: CachePolicy::new(minutes(30), Some(minutes(1))),
            user_events: CachePolicy::new(minutes(60), None),
            retention: CachePolicy::new(minutes(60), Some(minutes(60))),
            hot_elements: CachePolicy::new(minutes(60), Some(minutes(60))),
        }
    }
}
