//! Coarse device and browser detection from a `User-Agent` string.

use regex::Regex;
use std::sync::LazyLock;

static TABLET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ipad|tablet|kindle|silk|playbook").unwrap());

static ANDROID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)android").unwrap());

static MOBILE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)mobi|iphone|ipod|android|blackberry|windows phone|opera mini").unwrap()
});

/// Ordered so that browsers embedding another engine's token match first
/// (Edge and Opera carry `Chrome`, Chrome carries `Safari`).
static BROWSERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("Edge", r"Edg(e|A|iOS)?/"),
        ("Opera", r"OPR/|Opera"),
        ("Samsung Internet", r"SamsungBrowser/"),
        ("Firefox", r"Firefox/|FxiOS/"),
        ("Chrome", r"Chrome/|CriOS/"),
        ("Safari", r"Safari/"),
        ("Internet Explorer", r"MSIE |Trident/"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).unwrap()))
    .collect()
});

/// `desktop`, `mobile` or `tablet`; `None` for an empty user agent.
pub fn device_type(user_agent: &str) -> Option<&'static str> {
    if user_agent.trim().is_empty() {
        return None;
    }
    // Android phones announce "Mobile"; Android tablets do not.
    let android_tablet = ANDROID_REGEX.is_match(user_agent)
        && !user_agent.to_ascii_lowercase().contains("mobile");

    if TABLET_REGEX.is_match(user_agent) || android_tablet {
        Some("tablet")
    } else if MOBILE_REGEX.is_match(user_agent) {
        Some("mobile")
    } else {
        Some("desktop")
    }
}

/// Browser family, `None` when not recognised.
pub fn browser(user_agent: &str) -> Option<&'static str> {
    BROWSERS
        .iter()
        .find(|(_, re)| re.is_match(user_agent))
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const SAFARI_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
        (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const EDGE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
    const FIREFOX_ANDROID: &str = "Mozilla/5.0 (Android 14; Mobile; rv:121.0) Gecko/121.0 Firefox/121.0";
    const ANDROID_TABLET: &str = "Mozilla/5.0 (Linux; Android 13; SM-X700) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    #[test]
    fn test_device_type() {
        assert_eq!(device_type(CHROME_DESKTOP), Some("desktop"));
        assert_eq!(device_type(SAFARI_IPHONE), Some("mobile"));
        assert_eq!(device_type(SAFARI_IPAD), Some("tablet"));
        assert_eq!(device_type(FIREFOX_ANDROID), Some("mobile"));
        assert_eq!(device_type(ANDROID_TABLET), Some("tablet"));
        assert_eq!(device_type("  "), None);
    }

    #[test]
    fn test_browser() {
        assert_eq!(browser(CHROME_DESKTOP), Some("Chrome"));
        assert_eq!(browser(SAFARI_IPHONE), Some("Safari"));
        assert_eq!(browser(EDGE), Some("Edge"));
        assert_eq!(browser(FIREFOX_ANDROID), Some("Firefox"));
        assert_eq!(browser("curl/8.0"), None);
    }
}
