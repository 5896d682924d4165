//! Application layer: the event pipeline and the services behind the HTTP API.
//!
//! # Available Services
//!
//! - [`services::ingest_service::IngestService`] - Validation, freshness and queue publish
//! - [`services::event_processor::EventProcessor`] - Real-time aggregation and persistence
//! - [`services::stats_service::StatsService`] - Cached real-time statistics
//! - [`services::analytics_service::AnalyticsService`] - Cached analytical queries
//!
//! [`pipeline`] connects the queue to the processor.

pub mod pipeline;
pub mod services;
