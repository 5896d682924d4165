//! Small helpers shared across layers.
//!
//! - [`shard`] - per-process key-to-shard mapping for partitions and dispatch lanes
//! - [`user_agent`] - device and browser detection

pub mod shard;
pub mod user_agent;
