//! Query parameters of the analytics endpoints.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};
use validator::Validate;

/// `?limit=` of a user's event path (default 100, max 1000).
#[serde_as]
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserEventsParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<i64>,
}

impl UserEventsParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100)
    }
}

/// `?days=` of the retention snapshot (default 7, max 90).
#[serde_as]
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RetentionParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    #[validate(range(min = 1, max = 90))]
    pub days: Option<i64>,
}

impl RetentionParams {
    pub fn days(&self) -> i64 {
        self.days.unwrap_or(7)
    }
}

/// `?limit=` of the hot elements list (default 20, max 100).
#[serde_as]
#[derive(Debug, Default, Deserialize, Validate)]
pub struct HotElementsParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

impl HotElementsParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(UserEventsParams::default().limit(), 100);
        assert_eq!(RetentionParams::default().days(), 7);
        assert_eq!(HotElementsParams::default().limit(), 20);
    }

    #[test]
    fn test_bounds_are_validated() {
        let too_many = UserEventsParams { limit: Some(1001) };
        let too_long = RetentionParams { days: Some(91) };
        let zero = HotElementsParams { limit: Some(0) };

        assert!(too_many.validate().is_err());
        assert!(too_long.validate().is_err());
        assert!(zero.validate().is_err());
        assert!(UserEventsParams { limit: Some(1000) }.validate().is_ok());
    }
}
