//! Connection registry: tracks all active WebSocket connections per user.
//!
//! A user can have multiple concurrent connections (multiple devices/tabs).
//! The registry is the single owner of live connection senders; presence is
//! derived from it — a user is online iff they hold at least one connection.
//! All mutation goes through `register`/`unregister`; no other component
//! touches the map directly.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::ws::ConnectionSender;

/// Opaque identifier for one live transport connection (one per device/tab).
pub type ConnectionId = Uuid;

/// One live connection: its id plus the channel used to push frames to it.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: ConnectionSender,
}

/// Outcome of registering a connection.
pub struct RegisterOutcome {
    /// True if this was the user's first live connection (offline -> online).
    pub went_online: bool,
    /// Snapshot of all online user ids at registration time, for initial sync.
    pub online_users: Vec<String>,
}

/// In-memory connection registry keyed by user id.
///
/// Invariant: an entry exists iff its connection set is non-empty. Removing
/// the last connection for a user removes the map entry entirely. Per-user
/// mutations go through the DashMap entry API so concurrent
/// register/unregister calls for the same user are linearizable.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    users: Arc<DashMap<String, Vec<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection for a user.
    ///
    /// Reports whether the user transitioned offline -> online (the caller is
    /// responsible for the presence broadcast) and returns the current
    /// online-user snapshot for the new connection's initial sync.
    pub fn register(&self, user_id: &str, connection: Connection) -> RegisterOutcome {
        let went_online = match self.users.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().push(connection);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(vec![connection]);
                true
            }
        };

        tracing::debug!(
            user_id = %user_id,
            went_online = went_online,
            "Connection registered"
        );

        RegisterOutcome {
            went_online,
            online_users: self.online_users(),
        }
    }

    /// Remove a connection for a user.
    ///
    /// Returns true if this removed the user's last connection (the user went
    /// fully offline). Unregistering a connection that is already gone is a
    /// safe no-op, so the stale-connection reaper can race clean disconnects.
    pub fn unregister(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        if let Entry::Occupied(mut entry) = self.users.entry(user_id.to_string()) {
            let connections = entry.get_mut();
            let before = connections.len();
            connections.retain(|c| c.id != connection_id);
            let removed = connections.len() < before;
            if connections.is_empty() {
                entry.remove();
                tracing::debug!(user_id = %user_id, "Last connection unregistered");
                return removed;
            }
        }
        false
    }

    /// Current live connections for a user (empty if the user is offline).
    ///
    /// Returns an owned snapshot; mutating it does not affect the registry.
    pub fn connections_for(&self, user_id: &str) -> Vec<Connection> {
        self.users
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// O(1) presence check.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    /// Snapshot of all user ids with at least one live connection.
    pub fn online_users(&self) -> Vec<String> {
        self.users.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Connections whose transport channel has closed without a clean
    /// disconnect. Consumed by the stale-connection reaper.
    pub fn stale_connections(&self) -> Vec<(String, ConnectionId)> {
        self.users
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|c| c.sender.is_closed())
                    .map(|c| (entry.key().clone(), c.id))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
