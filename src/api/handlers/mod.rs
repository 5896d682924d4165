//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod analytics;
pub mod events;
pub mod health;
pub mod stats;

pub use analytics::{
    funnel_analysis_handler, hot_elements_handler, retention_handler, user_events_handler,
};
pub use events::ingest_events_handler;
pub use health::health_handler;
pub use stats::{
    conversion_rate_handler, dashboard_handler, event_stats_handler, hot_pages_handler,
    online_users_handler,
};
