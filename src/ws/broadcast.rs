//! Fan-out helpers: encode a server event once and push it to live connections.

use axum::extract::ws::Message;

use crate::realtime::registry::{ConnectionId, ConnectionRegistry};
use crate::ws::protocol::ServerEvent;
use crate::ws::ConnectionSender;

/// Send an event to a single connection.
/// A failed send means the connection is closing; the actor's own cleanup or
/// the stale-connection reaper will remove it, so the error is not surfaced.
pub fn send_to_connection(tx: &ConnectionSender, event: &ServerEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        let _ = tx.send(Message::Text(json.into()));
    }
}

/// Send an event to every live connection a user currently holds.
///
/// Returns the ids of the connections that accepted the frame — empty when
/// the user is offline, which callers treat as a normal "no live fan-out
/// target" outcome.
pub fn send_to_user(
    registry: &ConnectionRegistry,
    user_id: &str,
    event: &ServerEvent,
) -> Vec<ConnectionId> {
    let connections = registry.connections_for(user_id);
    if connections.is_empty() {
        return Vec::new();
    }

    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(_) => return Vec::new(),
    };
    let msg = Message::Text(json.into());

    connections
        .iter()
        .filter(|conn| conn.sender.send(msg.clone()).is_ok())
        .map(|conn| conn.id)
        .collect()
}
