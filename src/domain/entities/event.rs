//! Behavioral event entity and the fixed set of accepted event types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event kinds accepted at ingestion.
///
/// Anything outside this set is rejected by
/// [`crate::domain::validation::EventValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Click,
    View,
    Scroll,
    Purchase,
    Submit,
    Load,
    Exit,
    VisibilityChange,
}

impl EventType {
    /// Every accepted event type, in declaration order.
    pub const ALL: [EventType; 8] = [
        EventType::Click,
        EventType::View,
        EventType::Scroll,
        EventType::Purchase,
        EventType::Submit,
        EventType::Load,
        EventType::Exit,
        EventType::VisibilityChange,
    ];

    /// Wire name used in JSON payloads and store keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Click => "click",
            EventType::View => "view",
            EventType::Scroll => "scroll",
            EventType::Purchase => "purchase",
            EventType::Submit => "submit",
            EventType::Load => "load",
            EventType::Exit => "exit",
            EventType::VisibilityChange => "visibility_change",
        }
    }

    /// Whether this event type scores a page on the hot-pages leaderboard.
    pub fn counts_toward_page_score(&self) -> bool {
        matches!(self, EventType::View | EventType::Click)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

/// A single behavioral event reported by a client.
///
/// Events are immutable once accepted: the ingest boundary fills in missing
/// metadata (timestamp, user agent, IP) and from then on the same value is
/// published to the queue, decoded by the consumer and handed to the
/// processor. The JSON form of this struct is the queue payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: String,
    pub session_id: String,
    pub event_type: String,
    pub page_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Client-side event time in epoch milliseconds.
    pub timestamp: i64,
}

impl Event {
    /// Creates an event with the required fields only.
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        event_type: impl Into<String>,
        page_url: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            event_type: event_type.into(),
            page_url: page_url.into(),
            element: None,
            element_text: None,
            position_x: None,
            position_y: None,
            user_agent: None,
            ip_address: None,
            timestamp,
        }
    }

    /// Parsed event type, or `None` for a type outside the accepted set.
    pub fn kind(&self) -> Option<EventType> {
        self.event_type.parse().ok()
    }
}
