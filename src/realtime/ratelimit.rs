//! Per-connection rate limiting for high-frequency inbound events.
//!
//! A fixed minimum inter-event interval is enforced per (connection, event
//! type) pair. Rejected events are dropped, never queued or delayed; the
//! caller owes the sender an explicit error event. Low-frequency events
//! (friend requests, read receipts) never pass through here.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::registry::ConnectionId;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    /// Timestamp of the last accepted event per (connection, event type).
    last_accepted: Arc<DashMap<(ConnectionId, &'static str), Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: Arc::new(DashMap::new()),
        }
    }

    /// Check whether an event may pass the gate.
    ///
    /// The first event of a given type on a connection is always allowed.
    /// Acceptance records the new timestamp; rejection leaves the previous
    /// timestamp in place.
    pub fn allow(&self, connection_id: ConnectionId, event_type: &'static str) -> bool {
        let now = Instant::now();
        match self.last_accepted.entry((connection_id, event_type)) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) >= self.min_interval {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Drop all recorded state for a closed connection.
    pub fn forget(&self, connection_id: ConnectionId) {
        self.last_accepted
            .retain(|(id, _), _| *id != connection_id);
    }
}
