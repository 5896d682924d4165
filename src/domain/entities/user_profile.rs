//! Per-user aggregate derived from the event stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable profile of a user, maintained by the event processor.
///
/// A profile is created the first time a `user_id` is seen and updated on
/// every later event. Profiles are never deleted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub first_visit: DateTime<Utc>,
    pub last_visit: DateTime<Utc>,
    pub total_events: i64,
    pub total_sessions: i32,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Profile for a first-seen user.
    ///
    /// The event that creates the profile is not counted in `total_events`;
    /// the first visit opens the first session.
    pub fn first_seen(
        user_id: impl Into<String>,
        now: DateTime<Utc>,
        device_type: Option<String>,
        browser: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            first_visit: now,
            last_visit: now,
            total_events: 0,
            total_sessions: 1,
            device_type,
            browser,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies one more event to an existing profile.
    ///
    /// `last_visit` never moves backwards, so an event that is processed late
    /// (e.g. through the fallback path) cannot rewind it.
    pub fn record_event(&mut self, now: DateTime<Utc>) {
        self.total_events += 1;
        if now > self.last_visit {
            self.last_visit = now;
        }
        self.updated_at = now;
    }
}

/// Input for recording activity of a user in the durable store.
#[derive(Debug, Clone, PartialEq)]
pub struct UserActivity {
    pub user_id: String,
    pub seen_at: DateTime<Utc>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_first_seen_profile() {
        let now = Utc::now();
        let profile = UserProfile::first_seen("u1", now, Some("mobile".into()), None);

        assert_eq!(profile.user_id, "u1");
        assert_eq!(profile.total_events, 0);
        assert_eq!(profile.total_sessions, 1);
        assert_eq!(profile.first_visit, now);
        assert_eq!(profile.last_visit, now);
        assert_eq!(profile.created_at, now);
        assert_eq!(profile.updated_at, now);
        assert_eq!(profile.device_type.as_deref(), Some("mobile"));
    }

    #[test]
    fn test_record_event_increments_and_advances() {
        let start = Utc::now();
        let mut profile = UserProfile::first_seen("u1", start, None, None);

        let later = start + Duration::seconds(30);
        profile.record_event(later);

        assert_eq!(profile.total_events, 1);
        assert_eq!(profile.last_visit, later);
        assert_eq!(profile.updated_at, later);
        assert_eq!(profile.first_visit, start);
    }

    #[test]
    fn test_record_event_never_rewinds_last_visit() {
        let start = Utc::now();
        let mut profile = UserProfile::first_seen("u1", start, None, None);

        profile.record_event(start - Duration::seconds(5));

        assert_eq!(profile.total_events, 1);
        assert_eq!(profile.last_visit, start);
    }
}
