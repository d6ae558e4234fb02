//! Tests for the connection registry: the present-iff-nonempty invariant,
//! multi-device transitions, and stale-connection detection.

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use uuid::Uuid;

use linkup_realtime::realtime::registry::{Connection, ConnectionRegistry};

/// Create a connection plus the receiver half used to observe pushed frames.
fn test_conn() -> (Connection, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Connection {
            id: Uuid::now_v7(),
            sender: tx,
        },
        rx,
    )
}

#[tokio::test]
async fn test_user_present_iff_connection_set_nonempty() {
    let registry = ConnectionRegistry::new();
    let (conn, _rx) = test_conn();
    let conn_id = conn.id;

    assert!(!registry.is_online("alice"));

    registry.register("alice", conn);
    assert!(registry.is_online("alice"));
    assert_eq!(registry.connections_for("alice").len(), 1);

    let went_offline = registry.unregister("alice", conn_id);
    assert!(went_offline);
    assert!(!registry.is_online("alice"));
    assert!(registry.connections_for("alice").is_empty());
    assert!(registry.online_users().is_empty());
}

#[tokio::test]
async fn test_multi_device_transitions() {
    let registry = ConnectionRegistry::new();
    let (conn1, _rx1) = test_conn();
    let (conn2, _rx2) = test_conn();
    let (id1, id2) = (conn1.id, conn2.id);

    let first = registry.register("alice", conn1);
    assert!(first.went_online);

    let second = registry.register("alice", conn2);
    assert!(!second.went_online, "Second device must not re-announce online");
    assert_eq!(registry.connections_for("alice").len(), 2);

    assert!(
        !registry.unregister("alice", id1),
        "User with a remaining device must not go offline"
    );
    assert!(registry.is_online("alice"));

    assert!(registry.unregister("alice", id2));
    assert!(!registry.is_online("alice"));
}

#[tokio::test]
async fn test_unregister_unknown_connection_is_noop() {
    let registry = ConnectionRegistry::new();
    let (conn, _rx) = test_conn();
    registry.register("alice", conn);

    assert!(!registry.unregister("alice", Uuid::now_v7()));
    assert!(registry.is_online("alice"));

    assert!(!registry.unregister("ghost", Uuid::now_v7()));
}

#[tokio::test]
async fn test_register_returns_online_snapshot() {
    let registry = ConnectionRegistry::new();
    let (conn_a, _rx_a) = test_conn();
    let (conn_b, _rx_b) = test_conn();

    registry.register("alice", conn_a);
    let outcome = registry.register("bob", conn_b);

    let mut users = outcome.online_users;
    users.sort();
    assert_eq!(users, vec!["alice".to_string(), "bob".to_string()]);
}

#[tokio::test]
async fn test_connections_for_returns_defensive_copy() {
    let registry = ConnectionRegistry::new();
    let (conn, _rx) = test_conn();
    registry.register("alice", conn);

    let mut snapshot = registry.connections_for("alice");
    snapshot.clear();

    assert_eq!(registry.connections_for("alice").len(), 1);
}

#[tokio::test]
async fn test_stale_detection_flags_closed_channels_only() {
    let registry = ConnectionRegistry::new();
    let (dead_conn, dead_rx) = test_conn();
    let (live_conn, _live_rx) = test_conn();
    let dead_id = dead_conn.id;

    registry.register("alice", dead_conn);
    registry.register("alice", live_conn);

    assert!(registry.stale_connections().is_empty());

    drop(dead_rx);

    let stale = registry.stale_connections();
    assert_eq!(stale, vec![("alice".to_string(), dead_id)]);
}
