//! Business logic services for the application layer.

pub mod analytics_service;
pub mod event_processor;
pub mod ingest_service;
pub mod stats_service;

pub use analytics_service::AnalyticsService;
pub use event_processor::EventProcessor;
pub use ingest_service::{IngestService, IngestSummary};
pub use stats_service::StatsService;
