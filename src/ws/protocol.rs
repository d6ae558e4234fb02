//! Wire protocol for the realtime WebSocket.
//!
//! Events are JSON text frames shaped `{"type": <eventType>, "data": {...}}`.
//! Inbound events are decoded into [`ClientEvent`] and dispatched to the
//! event router; outbound events are encoded from [`ServerEvent`]. Payloads
//! that fail decoding yield an `error` event back to the sender and are
//! never forwarded.

use serde::{Deserialize, Serialize};

use crate::realtime::registry::ConnectionId;
use crate::realtime::router;
use crate::state::AppState;
use crate::ws::broadcast::send_to_connection;
use crate::ws::ConnectionSender;

/// Machine-readable reason for a rejected event.
pub const ERR_MALFORMED: &str = "malformed_event";
/// Machine-readable reason for a rate-limited event.
pub const ERR_RATE_LIMITED: &str = "rate_limited";

// --- Inbound events ---

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    SendMessage(SendMessage),
    Typing(Typing),
    MarkRead(MarkRead),
    Reaction(Reaction),
    DeleteMessage(DeleteMessage),
    EditMessage(EditMessage),
    FriendRequestSent(FriendRequestSent),
    FriendRequestAccepted(FriendRequestAccepted),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub receiver_id: String,
    /// Id assigned by the persistence layer before the live fan-out.
    pub message_id: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typing {
    pub receiver_id: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRead {
    /// The conversation peer whose messages were read.
    pub peer_id: String,
    /// Highest message id covered by this read receipt.
    pub message_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub receiver_id: String,
    pub message_id: String,
    pub emoji: String,
    #[serde(default)]
    pub removed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessage {
    pub receiver_id: String,
    pub message_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMessage {
    pub receiver_id: String,
    pub message_id: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestSent {
    pub to_user_id: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestAccepted {
    pub to_user_id: String,
    pub request_id: String,
}

// --- Outbound events ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    NewMessage {
        sender_id: String,
        message_id: String,
        body: String,
        sent_at: i64,
    },
    /// Live-delivery acknowledgment back to the sender. `delivered_live`
    /// false means the receiver had zero live connections; the message still
    /// exists durably upstream, so this is not an error.
    #[serde(rename_all = "camelCase")]
    MessageDelivered {
        receiver_id: String,
        message_id: String,
        delivered_live: bool,
        connections: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    MessagesRead {
        reader_id: String,
        message_id: String,
    },
    #[serde(rename_all = "camelCase")]
    MessageReaction {
        sender_id: String,
        message_id: String,
        emoji: String,
        removed: bool,
    },
    #[serde(rename_all = "camelCase")]
    MessageDeleted {
        sender_id: String,
        message_id: String,
    },
    #[serde(rename_all = "camelCase")]
    MessageEdited {
        sender_id: String,
        message_id: String,
        body: String,
    },
    #[serde(rename_all = "camelCase")]
    UserTyping { sender_id: String, is_typing: bool },
    #[serde(rename_all = "camelCase")]
    UserOnline { user_id: String },
    #[serde(rename_all = "camelCase")]
    UserOffline { user_id: String, last_seen: i64 },
    /// Online-user snapshot sent to a connection right after registration.
    #[serde(rename = "getOnlineUsers")]
    OnlineUsers { users: Vec<String> },
    #[serde(rename_all = "camelCase")]
    FriendRequestReceived {
        from_user_id: String,
        request_id: String,
    },
    #[serde(rename_all = "camelCase")]
    FriendRequestAccepted {
        by_user_id: String,
        request_id: String,
    },
    Error { reason: String, message: String },
}

/// Handle an incoming text (JSON) frame: decode the event and dispatch it.
pub fn handle_text_message(
    text: &str,
    tx: &ConnectionSender,
    state: &AppState,
    user_id: &str,
    connection_id: ConnectionId,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Failed to decode client event"
            );
            send_error(tx, ERR_MALFORMED, "Invalid event payload");
            return;
        }
    };

    router::dispatch(state, user_id, connection_id, tx, event);
}

/// Send a structured error event to a connection.
pub fn send_error(tx: &ConnectionSender, reason: &str, message: &str) {
    send_to_connection(
        tx,
        &ServerEvent::Error {
            reason: reason.to_string(),
            message: message.to_string(),
        },
    );
}
