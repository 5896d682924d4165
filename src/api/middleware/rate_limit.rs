//! Per-IP rate limiting of the ingest route using a token bucket.

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
};
use tracing::warn;

pub type PeerIpLayer =
    GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;
pub type ProxyIpLayer =
    GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Token bucket parameters for the ingest route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub per_second: u64,
    pub burst: u32,
}

impl RateLimit {
    /// `None` when rate limiting is disabled (`per_second == 0`).
    pub fn new(per_second: u64, burst: u32) -> Option<Self> {
        (per_second > 0).then_some(Self { per_second, burst })
    }
}

/// Limits by socket peer address.
///
/// Requests exceeding the limit receive `429 Too Many Requests`. Returns
/// `None` if the parameters are rejected by the limiter.
pub fn peer_layer(limit: RateLimit) -> Option<PeerIpLayer> {
    let config = GovernorConfigBuilder::default()
        .per_second(limit.per_second)
        .burst_size(limit.burst)
        .finish();

    match config {
        Some(config) => Some(GovernorLayer::new(Arc::new(config))),
        None => {
            warn!(?limit, "Invalid rate limit, ingest is not rate limited");
            None
        }
    }
}

/// Limits by `X-Forwarded-For` / `X-Real-IP` / `Forwarded`, falling back to
/// the peer address. Use only behind a trusted reverse proxy.
pub fn proxy_layer(limit: RateLimit) -> Option<ProxyIpLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(limit.per_second)
        .burst_size(limit.burst)
        .finish();

    match config {
        Some(config) => Some(GovernorLayer::new(Arc::new(config))),
        None => {
            warn!(?limit, "Invalid rate limit, ingest is not rate limited");
            None
        }
    }
}
