//! Event-router tests: fan-out, delivery acks, validation failures, and
//! rate-limit rejections, driven directly against the dispatch layer.

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use uuid::Uuid;

use linkup_realtime::config::RealtimeConfig;
use linkup_realtime::realtime::registry::Connection;
use linkup_realtime::realtime::router;
use linkup_realtime::state::AppState;
use linkup_realtime::ws::protocol::{self, ClientEvent, SendMessage, ServerEvent};
use linkup_realtime::ws::ConnectionSender;

fn test_state() -> AppState {
    AppState::new(vec![0u8; 32], &RealtimeConfig::default())
}

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

fn drain_events(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let Message::Text(text) = msg {
            events.push(serde_json::from_str(text.as_str()).expect("valid server event"));
        }
    }
    events
}

/// Register a sender and return its connection id, channel, and receiver.
fn register_sender(
    state: &AppState,
    user_id: &str,
) -> (Uuid, ConnectionSender, mpsc::UnboundedReceiver<Message>) {
    let (conn, rx) = test_conn();
    let (id, tx) = (conn.id, conn.sender.clone());
    state.registry.register(user_id, conn);
    (id, tx, rx)
}

fn send_message_event(receiver_id: &str, message_id: &str, body: &str) -> ClientEvent {
    ClientEvent::SendMessage(SendMessage {
        receiver_id: receiver_id.to_string(),
        message_id: message_id.to_string(),
        body: body.to_string(),
    })
}

#[tokio::test(start_paused = true)]
async fn test_message_fans_out_to_all_receiver_connections() {
    let state = test_state();
    let (conn_id, tx, mut sender_rx) = register_sender(&state, "alice");

    let mut receiver_rxs = Vec::new();
    for _ in 0..3 {
        let (conn, rx) = test_conn();
        state.registry.register("bob", conn);
        receiver_rxs.push(rx);
    }

    router::dispatch(
        &state,
        "alice",
        conn_id,
        &tx,
        send_message_event("bob", "m1", "hello"),
    );

    for rx in receiver_rxs.iter_mut() {
        let events = drain_events(rx);
        assert_eq!(events.len(), 1, "Every device must receive the message");
        assert!(matches!(
            &events[0],
            ServerEvent::NewMessage { sender_id, message_id, body, .. }
                if sender_id == "alice" && message_id == "m1" && body == "hello"
        ));
    }

    let acks = drain_events(&mut sender_rx);
    assert_eq!(acks.len(), 1);
    match &acks[0] {
        ServerEvent::MessageDelivered {
            receiver_id,
            message_id,
            delivered_live,
            connections,
        } => {
            assert_eq!(receiver_id, "bob");
            assert_eq!(message_id, "m1");
            assert!(delivered_live);
            assert_eq!(connections.len(), 3);
        }
        other => panic!("Expected MessageDelivered, got: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_message_to_offline_user_is_acked_not_errored() {
    let state = test_state();
    let (conn_id, tx, mut sender_rx) = register_sender(&state, "alice");

    router::dispatch(
        &state,
        "alice",
        conn_id,
        &tx,
        send_message_event("nobody", "m1", "hello"),
    );

    let acks = drain_events(&mut sender_rx);
    assert_eq!(acks.len(), 1);
    assert!(matches!(
        &acks[0],
        ServerEvent::MessageDelivered { delivered_live: false, connections, .. }
            if connections.is_empty()
    ));
}

#[tokio::test(start_paused = true)]
async fn test_second_message_inside_interval_is_rate_limited() {
    let state = test_state();
    let (conn_id, tx, mut sender_rx) = register_sender(&state, "alice");
    let (conn, mut receiver_rx) = test_conn();
    state.registry.register("bob", conn);

    router::dispatch(
        &state,
        "alice",
        conn_id,
        &tx,
        send_message_event("bob", "m1", "first"),
    );
    router::dispatch(
        &state,
        "alice",
        conn_id,
        &tx,
        send_message_event("bob", "m2", "second"),
    );

    assert_eq!(
        drain_events(&mut receiver_rx).len(),
        1,
        "Rate-limited message must not be forwarded"
    );

    let sender_events = drain_events(&mut sender_rx);
    assert_eq!(sender_events.len(), 2);
    assert!(matches!(sender_events[0], ServerEvent::MessageDelivered { .. }));
    assert!(matches!(
        &sender_events[1],
        ServerEvent::Error { reason, .. } if reason == "rate_limited"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_errors_sender_and_skips_recipient() {
    let state = test_state();
    let (conn_id, tx, mut sender_rx) = register_sender(&state, "alice");
    let (conn, mut receiver_rx) = test_conn();
    state.registry.register("bob", conn);

    // Missing required fields fails decoding before dispatch
    protocol::handle_text_message(
        r#"{"type":"sendMessage","data":{"receiverId":"bob"}}"#,
        &tx,
        &state,
        "alice",
        conn_id,
    );

    // Unknown event type is also malformed
    protocol::handle_text_message(r#"{"type":"selfDestruct","data":{}}"#, &tx, &state, "alice", conn_id);

    // Decodes, but the empty body fails shape validation in the router
    protocol::handle_text_message(
        r#"{"type":"sendMessage","data":{"receiverId":"bob","messageId":"m1","body":""}}"#,
        &tx,
        &state,
        "alice",
        conn_id,
    );

    let errors = drain_events(&mut sender_rx);
    assert_eq!(errors.len(), 3);
    for event in &errors {
        assert!(matches!(
            event,
            ServerEvent::Error { reason, .. } if reason == "malformed_event"
        ));
    }

    assert!(
        drain_events(&mut receiver_rx).is_empty(),
        "Malformed events must never be forwarded"
    );
}

#[tokio::test(start_paused = true)]
async fn test_mark_read_notifies_peer_connections() {
    let state = test_state();
    let (conn_id, tx, _sender_rx) = register_sender(&state, "alice");
    let (conn, mut peer_rx) = test_conn();
    state.registry.register("bob", conn);

    protocol::handle_text_message(
        r#"{"type":"markRead","data":{"peerId":"bob","messageId":"m42"}}"#,
        &tx,
        &state,
        "alice",
        conn_id,
    );

    assert_eq!(
        drain_events(&mut peer_rx),
        vec![ServerEvent::MessagesRead {
            reader_id: "alice".to_string(),
            message_id: "m42".to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_mutation_events_fan_out_to_counterpart() {
    let state = test_state();
    let (conn_id, tx, _sender_rx) = register_sender(&state, "alice");
    let (conn, mut peer_rx) = test_conn();
    state.registry.register("bob", conn);

    protocol::handle_text_message(
        r#"{"type":"reaction","data":{"receiverId":"bob","messageId":"m1","emoji":"🔥"}}"#,
        &tx,
        &state,
        "alice",
        conn_id,
    );
    protocol::handle_text_message(
        r#"{"type":"editMessage","data":{"receiverId":"bob","messageId":"m1","body":"edited"}}"#,
        &tx,
        &state,
        "alice",
        conn_id,
    );
    protocol::handle_text_message(
        r#"{"type":"deleteMessage","data":{"receiverId":"bob","messageId":"m1"}}"#,
        &tx,
        &state,
        "alice",
        conn_id,
    );

    let events = drain_events(&mut peer_rx);
    assert_eq!(
        events,
        vec![
            ServerEvent::MessageReaction {
                sender_id: "alice".to_string(),
                message_id: "m1".to_string(),
                emoji: "🔥".to_string(),
                removed: false,
            },
            ServerEvent::MessageEdited {
                sender_id: "alice".to_string(),
                message_id: "m1".to_string(),
                body: "edited".to_string(),
            },
            ServerEvent::MessageDeleted {
                sender_id: "alice".to_string(),
                message_id: "m1".to_string(),
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_friend_requests_reach_target_only_and_bypass_rate_limit() {
    let state = test_state();
    let (conn_id, tx, _sender_rx) = register_sender(&state, "alice");
    let (conn_b, mut bob_rx) = test_conn();
    let (conn_c, mut carol_rx) = test_conn();
    state.registry.register("bob", conn_b);
    state.registry.register("carol", conn_c);

    // Burst of friend-request events, all inside the message rate window
    for i in 0..5 {
        protocol::handle_text_message(
            &format!(
                r#"{{"type":"friendRequestSent","data":{{"toUserId":"bob","requestId":"r{}"}}}}"#,
                i
            ),
            &tx,
            &state,
            "alice",
            conn_id,
        );
    }
    protocol::handle_text_message(
        r#"{"type":"friendRequestAccepted","data":{"toUserId":"bob","requestId":"r0"}}"#,
        &tx,
        &state,
        "alice",
        conn_id,
    );

    let bob_events = drain_events(&mut bob_rx);
    assert_eq!(bob_events.len(), 6, "Friend requests are never throttled");
    assert!(matches!(
        &bob_events[0],
        ServerEvent::FriendRequestReceived { from_user_id, request_id }
            if from_user_id == "alice" && request_id == "r0"
    ));
    assert!(matches!(
        &bob_events[5],
        ServerEvent::FriendRequestAccepted { by_user_id, .. } if by_user_id == "alice"
    ));

    assert!(
        drain_events(&mut carol_rx).is_empty(),
        "Friend requests go to the target user only"
    );
}
