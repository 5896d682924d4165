//! Shared state handed to every HTTP handler.

use std::sync::Arc;

use crate::application::pipeline::PipelineStats;
use crate::application::services::{AnalyticsService, IngestService, StatsService};
use crate::infrastructure::store::RealtimeStore;

#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub stats: Arc<StatsService>,
    pub analytics: Arc<AnalyticsService>,
    pub store: Arc<dyn RealtimeStore>,
    pub pipeline: Arc<PipelineStats>,
    pub max_batch_size: usize,
}
