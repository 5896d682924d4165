//! Admission checks applied to every inbound event before it is queued.
//!
//! Both checks are pure: they never touch a store and never mutate the event.
//! A rejected event is dropped by the ingest boundary and only shows up in the
//! logs and the `events_rejected_total` counter.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::entities::{Event, EventType};

/// Default maximum accepted event age in seconds.
pub const DEFAULT_MAX_EVENT_AGE_SECONDS: i64 = 300;

/// Reason an event failed structural or semantic validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),

    #[error("timestamp must be greater than 0, got {0}")]
    NonPositiveTimestamp(i64),

    #[error("unsupported event type: {0}")]
    UnknownEventType(String),
}

impl ValidationError {
    /// Short label used as a metrics dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::NonPositiveTimestamp(_) => "invalid_timestamp",
            ValidationError::UnknownEventType(_) => "unknown_event_type",
        }
    }
}

/// An event older than the configured freshness window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event is {age_seconds}s old, max age is {max_age_seconds}s")]
pub struct StaleEvent {
    pub age_seconds: i64,
    pub max_age_seconds: i64,
}

/// Structural and semantic validator for inbound events.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventValidator;

impl EventValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates an event.
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// 1. `user_id`, `session_id`, `event_type`, `page_url` are non-empty
    /// 2. `timestamp > 0`
    /// 3. `event_type` is one of [`EventType::ALL`]
    pub fn validate(&self, event: &Event) -> Result<EventType, ValidationError> {
        let required = [
            ("user_id", &event.user_id),
            ("session_id", &event.session_id),
            ("event_type", &event.event_type),
            ("page_url", &event.page_url),
        ];

        for (field, value) in required {
            if value.is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }

        if event.timestamp <= 0 {
            return Err(ValidationError::NonPositiveTimestamp(event.timestamp));
        }

        event
            .kind()
            .ok_or_else(|| ValidationError::UnknownEventType(event.event_type.clone()))
    }
}

/// Rejects events whose client timestamp is too far in the past.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessGate {
    max_age_seconds: i64,
}

impl Default for FreshnessGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EVENT_AGE_SECONDS)
    }
}

impl FreshnessGate {
    pub fn new(max_age_seconds: i64) -> Self {
        Self { max_age_seconds }
    }

    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_seconds
    }

    /// Whole seconds elapsed between the event timestamp and `now`.
    pub fn age_seconds(event: &Event, now: DateTime<Utc>) -> i64 {
        (now.timestamp_millis() - event.timestamp) / 1000
    }

    /// `true` when the event is at most `max_age_seconds` old (inclusive).
    pub fn is_fresh(&self, event: &Event, now: DateTime<Utc>) -> bool {
        Self::age_seconds(event, now) <= self.max_age_seconds
    }

    /// Like [`Self::is_fresh`] but reports the computed age on rejection.
    pub fn check(&self, event: &Event, now: DateTime<Utc>) -> Result<(), StaleEvent> {
        let age_seconds = Self::age_seconds(event, now);
        if age_seconds <= self.max_age_seconds {
            Ok(())
        } else {
            Err(StaleEvent {
                age_seconds,
                max_age_seconds: self.max_age_seconds,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn valid_event() -> Event {
        Event::new("u1", "s1", "click", "/products", 1_700_000_000_000)
    }

    #[test]
    fn test_valid_event_passes() {
        assert_eq!(
            EventValidator::new().validate(&valid_event()),
            Ok(EventType::Click)
        );
    }

    #[test]
    fn test_each_empty_required_field_is_named() {
        let validator = EventValidator::new();
        let cases: [(&str, fn(&mut Event)); 4] = [
            ("user_id", |e| e.user_id.clear()),
            ("session_id", |e| e.session_id.clear()),
            ("event_type", |e| e.event_type.clear()),
            ("page_url", |e| e.page_url.clear()),
        ];

        for (field, clear) in cases {
            let mut event = valid_event();
            clear(&mut event);
            assert_eq!(
                validator.validate(&event),
                Err(ValidationError::MissingField(field))
            );
        }
    }

    #[test]
    fn test_first_failing_check_wins() {
        let mut event = valid_event();
        event.session_id.clear();
        event.timestamp = 0;
        event.event_type = "bogus".into();

        assert_eq!(
            EventValidator::new().validate(&event),
            Err(ValidationError::MissingField("session_id"))
        );
    }

    #[test]
    fn test_non_positive_timestamp_rejected() {
        let mut event = valid_event();
        event.timestamp = -5;

        assert_eq!(
            EventValidator::new().validate(&event),
            Err(ValidationError::NonPositiveTimestamp(-5))
        );
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let mut event = valid_event();
        event.event_type = "add_to_cart".into();

        let err = EventValidator::new().validate(&event).unwrap_err();
        assert_eq!(err, ValidationError::UnknownEventType("add_to_cart".into()));
        assert_eq!(err.reason(), "unknown_event_type");
    }

    #[test]
    fn test_freshness_boundary_is_inclusive() {
        let now = Utc.timestamp_millis_opt(1_700_000_300_000).unwrap();
        let gate = FreshnessGate::new(300);

        let mut event = valid_event();
        event.timestamp = (now - Duration::seconds(300)).timestamp_millis();
        assert!(gate.is_fresh(&event, now));

        event.timestamp = (now - Duration::seconds(301)).timestamp_millis();
        assert!(!gate.is_fresh(&event, now));
    }

    #[test]
    fn test_freshness_uses_whole_seconds() {
        let now = Utc.timestamp_millis_opt(1_700_000_300_000).unwrap();
        let gate = FreshnessGate::new(300);

        let mut event = valid_event();
        event.timestamp = now.timestamp_millis() - 300_999;

        assert_eq!(FreshnessGate::age_seconds(&event, now), 300);
        assert!(gate.is_fresh(&event, now));
    }

    #[test]
    fn test_stale_event_reports_age() {
        let now = Utc.timestamp_millis_opt(1_700_001_000_000).unwrap();
        let gate = FreshnessGate::default();

        let mut event = valid_event();
        event.timestamp = 1_700_000_000_000;

        assert_eq!(
            gate.check(&event, now),
            Err(StaleEvent {
                age_seconds: 1000,
                max_age_seconds: DEFAULT_MAX_EVENT_AGE_SECONDS,
            })
        );
    }

    #[test]
    fn test_event_from_the_future_is_fresh() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut event = valid_event();
        event.timestamp = now.timestamp_millis() + 60_000;

        assert!(FreshnessGate::default().is_fresh(&event, now));
    }
}
