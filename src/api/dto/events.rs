//! DTOs for the event ingestion endpoint.

use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};
use validator::Validate;

use crate::domain::entities::Event;

/// Batch of events reported by a client SDK.
#[derive(Debug, Deserialize, Validate)]
pub struct EventBatchRequest {
    #[validate(length(max = 10000, message = "Too many events in one batch"))]
    pub events: Vec<EventPayload>,
}

/// One event as sent by a client.
///
/// Missing or `null` strings deserialize as empty so that the pipeline, not
/// the JSON decoder, rejects them per event. `timestamp` is optional; the
/// handler stamps events that lack one.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub user_id: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub session_id: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub event_type: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub page_url: String,
    pub element: Option<String>,
    pub element_text: Option<String>,
    pub position_x: Option<i32>,
    pub position_y: Option<i32>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    /// Client-side event time in epoch milliseconds.
    pub timestamp: Option<i64>,
}

/// Request metadata used to fill in what the client left out.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl EventPayload {
    /// Builds the immutable [`Event`], defaulting the timestamp to `now_ms`
    /// and user agent / IP to the request's.
    pub fn into_event(self, now_ms: i64, client: &ClientContext) -> Event {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Event {
            user_id: self.user_id,
            session_id: self.session_id,
            event_type: self.event_type,
            page_url: self.page_url,
            element: self.element,
            element_text: self.element_text,
            position_x: self.position_x,
            position_y: self.position_y,
            user_agent: non_empty(self.user_agent).or_else(|| client.user_agent.clone()),
            ip_address: non_empty(self.ip_address).or_else(|| client.ip_address.clone()),
            timestamp: self.timestamp.unwrap_or(now_ms),
        }
    }
}

/// Ingestion acknowledgement; `count` is the number of accepted events.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventResponse {
    pub status: String,
    pub message: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_timestamp_is_stamped() {
        let payload: EventPayload = serde_json::from_str(
            r#"{"user_id":"u1","session_id":"s1","event_type":"view","page_url":"/"}"#,
        )
        .unwrap();

        let event = payload.into_event(1_700_000_000_000, &ClientContext::default());

        assert_eq!(event.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_explicit_timestamp_is_kept() {
        let payload = EventPayload {
            timestamp: Some(0),
            ..Default::default()
        };

        assert_eq!(payload.into_event(42, &ClientContext::default()).timestamp, 0);
    }

    #[test]
    fn test_client_context_fills_blanks_only() {
        let client = ClientContext {
            user_agent: Some("curl/8.0".to_string()),
            ip_address: Some("10.0.0.1".to_string()),
        };
        let payload = EventPayload {
            user_agent: Some(" ".to_string()),
            ip_address: Some("192.168.1.5".to_string()),
            ..Default::default()
        };

        let event = payload.into_event(1, &client);

        assert_eq!(event.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(event.ip_address.as_deref(), Some("192.168.1.5"));
    }

    #[test]
    fn test_null_fields_decode_as_empty() {
        let request: EventBatchRequest = serde_json::from_str(
            r#"{"events":[
                {"user_id":"u1","session_id":"s1","event_type":"view","page_url":"/"},
                {"user_id":null,"session_id":null,"event_type":"view","page_url":null}
            ]}"#,
        )
        .unwrap();

        assert_eq!(request.events.len(), 2);
        assert!(request.events[1].user_id.is_empty());
        assert!(request.events[1].page_url.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_decode_as_empty() {
        let payload: EventPayload = serde_json::from_str(r#"{"event_type":"click"}"#).unwrap();

        assert!(payload.user_id.is_empty());
        assert_eq!(payload.event_type, "click");
    }
}
