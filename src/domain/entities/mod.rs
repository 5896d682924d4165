//! Core domain entities of the event pipeline.
//!
//! # Entity Types
//!
//! - [`Event`] - A behavioral event reported by a client
//! - [`UserProfile`] - Per-user aggregate maintained by the processor
//! - [`analytics`] - Derived read-side shapes (funnel, dashboard, paths)

pub mod analytics;
pub mod event;
pub mod user_profile;

pub use analytics::{
    DailyActiveUsers, DashboardStats, ElementStat, EventStats, FunnelResult, FunnelStep,
    PageStat, UserPathEntry,
};
pub use event::{Event, EventType};
pub use user_profile::{UserActivity, UserProfile};
