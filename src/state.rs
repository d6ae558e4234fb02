use std::time::Duration;

use crate::config::RealtimeConfig;
use crate::realtime::ratelimit::RateLimiter;
use crate::realtime::registry::ConnectionRegistry;
use crate::realtime::typing::TypingTracker;

/// Shared application state passed to all handlers via axum State extractor.
/// Cheap to clone: every component is Arc-backed internally.
#[derive(Clone)]
pub struct AppState {
    /// JWT validation secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Active WebSocket connections per user
    pub registry: ConnectionRegistry,
    /// Per-connection gate on high-frequency inbound events
    pub rate_limiter: RateLimiter,
    /// Typing-indicator state per (sender, receiver) pair
    pub typing: TypingTracker,
}

impl AppState {
    pub fn new(jwt_secret: Vec<u8>, realtime: &RealtimeConfig) -> Self {
        Self {
            jwt_secret,
            registry: ConnectionRegistry::new(),
            rate_limiter: RateLimiter::new(Duration::from_millis(
                realtime.message_min_interval_ms,
            )),
            typing: TypingTracker::new(Duration::from_secs(realtime.typing_timeout_secs)),
        }
    }
}
