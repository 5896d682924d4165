//! Handler for event ingestion.

use axum::{
    Json,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    http::{Extensions, HeaderMap, header},
};
use chrono::Utc;
use serde_json::json;
use std::net::SocketAddr;
use tracing::info;
use validator::Validate;

use crate::api::dto::events::{ClientContext, EventBatchRequest, EventResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Accepts a batch of behavioral events.
///
/// # Endpoint
///
/// `POST /api/events`
///
/// # Request Body
///
/// ```json
/// { "events": [ { "user_id": "u1", "session_id": "s1", "event_type": "view",
///                 "page_url": "/home", "timestamp": 1700000000000 } ] }
/// ```
///
/// # Response
///
/// ```json
/// { "status": "success", "message": "Events received", "count": 1 }
/// ```
///
/// `count` is the number of accepted events. Invalid and stale events are
/// dropped without failing the request; the reasons are only logged.
///
/// # Errors
///
/// Returns 400 Bad Request for a malformed body or an oversized batch, and
/// 503 Service Unavailable while shutting down.
pub async fn ingest_events_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    payload: Result<Json<EventBatchRequest>, JsonRejection>,
) -> Result<Json<EventResponse>, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    if request.events.len() > state.max_batch_size {
        return Err(AppError::bad_request(
            "Too many events in one batch",
            json!({ "max_batch_size": state.max_batch_size, "received": request.events.len() }),
        ));
    }

    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_context(&headers, peer);

    let now = Utc::now();
    let now_ms = now.timestamp_millis();
    let events = request
        .events
        .into_iter()
        .map(|payload| payload.into_event(now_ms, &client))
        .collect();

    let summary = state.ingest.ingest(events, now).await?;

    info!(
        received = summary.received,
        accepted = summary.accepted,
        rejected = summary.rejected,
        stale = summary.stale,
        fallback = summary.fallback,
        "Event batch ingested"
    );

    Ok(Json(EventResponse {
        status: "success".to_string(),
        message: "Events received".to_string(),
        count: summary.accepted,
    }))
}

/// User agent and client IP of the request.
///
/// The IP is the first `X-Forwarded-For` entry, then `X-Real-IP`, then the
/// socket peer address.
pub fn client_context(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientContext {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let forwarded = header_str("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let ip_address = forwarded
        .or_else(|| header_str("x-real-ip"))
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()));

    ClientContext {
        user_agent: header_str(header::USER_AGENT.as_str()).map(str::to_string),
        ip_address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("sdk/1.0"));

        let client = client_context(&headers, Some("127.0.0.1:5000".parse().unwrap()));

        assert_eq!(client.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(client.user_agent.as_deref(), Some("sdk/1.0"));
    }

    #[test]
    fn test_falls_back_to_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(
            client_context(&headers, None).ip_address.as_deref(),
            Some("10.0.0.2")
        );

        let client = client_context(&HeaderMap::new(), Some("127.0.0.1:5000".parse().unwrap()));
        assert_eq!(client.ip_address.as_deref(), Some("127.0.0.1"));
        assert_eq!(client.user_agent, None);
    }
}
