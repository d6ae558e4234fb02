//! Presence transitions and broadcast.
//!
//! Announces online/offline transitions to every other online user. The
//! registry reports transitions from its register/unregister operations, so
//! a second device coming up or a partial disconnect never reaches here —
//! that is what keeps the broadcasts single-shot.

use chrono::Utc;

use super::registry::ConnectionRegistry;
use crate::ws::broadcast::send_to_user;
use crate::ws::protocol::ServerEvent;

/// Broadcast `userOnline` to all online peers of a user whose connection
/// count just transitioned zero -> one. The user's own new connection learns
/// current presence from the registration snapshot instead.
pub fn broadcast_user_online(registry: &ConnectionRegistry, user_id: &str) {
    let event = ServerEvent::UserOnline {
        user_id: user_id.to_string(),
    };

    for peer in registry.online_users() {
        if peer != user_id {
            send_to_user(registry, &peer, &event);
        }
    }

    tracing::debug!(user_id = %user_id, "Broadcast user online");
}

/// Broadcast `userOffline` with a last-seen timestamp to all online users.
/// Called after the registry removed the user's last connection, so the
/// departing user is no longer a broadcast target.
pub fn broadcast_user_offline(registry: &ConnectionRegistry, user_id: &str) {
    let event = ServerEvent::UserOffline {
        user_id: user_id.to_string(),
        last_seen: Utc::now().timestamp_millis(),
    };

    for peer in registry.online_users() {
        send_to_user(registry, &peer, &event);
    }

    tracing::debug!(user_id = %user_id, "Broadcast user offline");
}
