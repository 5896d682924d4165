//! Queue-to-processor pipeline: partition consumers, dispatch lanes and counters.

pub mod consumer;
pub mod dispatcher;
pub mod stats;

pub use consumer::start_consumers;
pub use dispatcher::{DispatchPool, EventHandler};
pub use stats::{PipelineEvent, PipelineSnapshot, PipelineStats};
