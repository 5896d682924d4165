//! Per-process key-to-shard mapping.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Maps `key` onto one of `shards` buckets.
///
/// The same key always lands in the same bucket for a given shard count
/// within one process. `DefaultHasher` output may change between Rust
/// releases, so the mapping must not be persisted or shared across
/// processes; dispatch lanes and the in-process queue only need it locally.
pub fn shard_for(key: &str, shards: usize) -> usize {
    if shards <= 1 {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}
