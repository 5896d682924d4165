//! Key layout of the real-time counters.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Set of users active in the last [`ONLINE_USERS_TTL`].
pub const ONLINE_USERS: &str = "online_users";
/// Global event counter.
pub const TOTAL_EVENTS: &str = "total_events";
/// Sorted set of pages scored by views and clicks.
pub const HOT_PAGES: &str = "hot_pages";

pub const ONLINE_USERS_TTL: Duration = Duration::from_secs(5 * 60);
pub const SESSION_TTL: Duration = Duration::from_secs(30 * 60);
pub const HOURLY_COUNTER_TTL: Duration = Duration::from_secs(25 * 60 * 60);

/// Counter of events of one type, e.g. `events:click`.
pub fn events_of_type(event_type: &str) -> String {
    format!("events:{event_type}")
}

/// Hash with the last activity of a session.
pub fn session(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Counter of events received in the UTC hour of `at`, e.g. `events:hour:2024011509`.
pub fn hourly_events(at: DateTime<Utc>) -> String {
    format!("events:hour:{}", at.format("%Y%m%d%H"))
}
