//! Read-side caching on top of the real-time store.
//!
//! - [`CacheAside`] - compute-if-absent wrapper used by all cached reads
//! - [`CachePolicy`] / [`CachePolicies`] - TTL and time-bucket width per query
//! - [`CacheKey`] - `prefix_param_..._bucket` keys

mod cache_aside;
mod policy;

pub use cache_aside::CacheAside;
pub use policy::{CACHE_NAMESPACE, CacheKey, CachePolicies, CachePolicy, bucket_label};
