//! Event router: shape checks, rate limiting, and recipient fan-out.
//!
//! Every inbound event resolves its recipient through the connection
//! registry and is delivered to all of the recipient's live connections.
//! A recipient with zero live connections is a normal outcome — message
//! durability is owned by the persistence service upstream of this gateway,
//! so nothing is retried or queued here.

use chrono::Utc;

use super::presence;
use super::registry::{Connection, ConnectionId};
use crate::state::AppState;
use crate::ws::broadcast::{send_to_connection, send_to_user};
use crate::ws::protocol::{
    self, ClientEvent, DeleteMessage, EditMessage, FriendRequestAccepted, FriendRequestSent,
    MarkRead, Reaction, SendMessage, ServerEvent, Typing, ERR_MALFORMED, ERR_RATE_LIMITED,
};
use crate::ws::ConnectionSender;

/// Register a new connection and run the connect-side effects: presence
/// broadcast on the offline -> online transition and the online-user
/// snapshot for the new connection.
pub fn handle_connect(state: &AppState, user_id: &str, connection: Connection) {
    let tx = connection.sender.clone();
    let outcome = state.registry.register(user_id, connection);

    if outcome.went_online {
        presence::broadcast_user_online(&state.registry, user_id);
    }

    send_to_connection(
        &tx,
        &ServerEvent::OnlineUsers {
            users: outcome.online_users,
        },
    );
}

/// Shared disconnect path for clean closes and reaped connections.
/// Safe to call more than once for the same connection: the second call
/// finds nothing to remove and produces no broadcast.
pub fn handle_disconnect(state: &AppState, user_id: &str, connection_id: ConnectionId) {
    let went_offline = state.registry.unregister(user_id, connection_id);
    state.rate_limiter.forget(connection_id);

    if went_offline {
        state.typing.cancel_for_user(user_id);
        presence::broadcast_user_offline(&state.registry, user_id);
    }
}

/// Dispatch a decoded client event to the matching handler.
pub fn dispatch(
    state: &AppState,
    sender_id: &str,
    connection_id: ConnectionId,
    tx: &ConnectionSender,
    event: ClientEvent,
) {
    match event {
        ClientEvent::SendMessage(msg) => {
            handle_send_message(state, sender_id, connection_id, tx, msg)
        }
        ClientEvent::Typing(typing) => handle_typing(state, sender_id, tx, typing),
        ClientEvent::MarkRead(read) => handle_mark_read(state, sender_id, tx, read),
        ClientEvent::Reaction(reaction) => handle_reaction(state, sender_id, tx, reaction),
        ClientEvent::DeleteMessage(del) => handle_delete_message(state, sender_id, tx, del),
        ClientEvent::EditMessage(edit) => handle_edit_message(state, sender_id, tx, edit),
        ClientEvent::FriendRequestSent(req) => {
            handle_friend_request_sent(state, sender_id, tx, req)
        }
        ClientEvent::FriendRequestAccepted(req) => {
            handle_friend_request_accepted(state, sender_id, tx, req)
        }
    }
}

/// Rate-limited. Fans `newMessage` out to the receiver and acks the sender
/// with the set of connections reached.
fn handle_send_message(
    state: &AppState,
    sender_id: &str,
    connection_id: ConnectionId,
    tx: &ConnectionSender,
    msg: SendMessage,
) {
    if !state.rate_limiter.allow(connection_id, "sendMessage") {
        tracing::debug!(
            user_id = %sender_id,
            connection_id = %connection_id,
            "Message dropped by rate limiter"
        );
        protocol::send_error(tx, ERR_RATE_LIMITED, "Sending messages too fast");
        return;
    }

    if msg.receiver_id.is_empty() || msg.message_id.is_empty() || msg.body.is_empty() {
        protocol::send_error(
            tx,
            ERR_MALFORMED,
            "sendMessage requires receiverId, messageId and body",
        );
        return;
    }

    let delivered = send_to_user(
        &state.registry,
        &msg.receiver_id,
        &ServerEvent::NewMessage {
            sender_id: sender_id.to_string(),
            message_id: msg.message_id.clone(),
            body: msg.body,
            sent_at: Utc::now().timestamp_millis(),
        },
    );

    send_to_connection(
        tx,
        &ServerEvent::MessageDelivered {
            receiver_id: msg.receiver_id,
            message_id: msg.message_id,
            delivered_live: !delivered.is_empty(),
            connections: delivered.iter().map(ConnectionId::to_string).collect(),
        },
    );
}

/// Not rate-limited: the debouncer is self-limiting.
fn handle_typing(state: &AppState, sender_id: &str, tx: &ConnectionSender, typing: Typing) {
    if typing.receiver_id.is_empty() {
        protocol::send_error(tx, ERR_MALFORMED, "typing requires receiverId");
        return;
    }

    if typing.is_typing {
        state
            .typing
            .typing_started(&state.registry, sender_id, &typing.receiver_id);
    } else {
        state
            .typing
            .typing_stopped(&state.registry, sender_id, &typing.receiver_id);
    }
}

fn handle_mark_read(state: &AppState, reader_id: &str, tx: &ConnectionSender, read: MarkRead) {
    if read.peer_id.is_empty() || read.message_id.is_empty() {
        protocol::send_error(tx, ERR_MALFORMED, "markRead requires peerId and messageId");
        return;
    }

    send_to_user(
        &state.registry,
        &read.peer_id,
        &ServerEvent::MessagesRead {
            reader_id: reader_id.to_string(),
            message_id: read.message_id,
        },
    );
}

fn handle_reaction(state: &AppState, sender_id: &str, tx: &ConnectionSender, reaction: Reaction) {
    if reaction.receiver_id.is_empty() || reaction.message_id.is_empty() || reaction.emoji.is_empty()
    {
        protocol::send_error(
            tx,
            ERR_MALFORMED,
            "reaction requires receiverId, messageId and emoji",
        );
        return;
    }

    send_to_user(
        &state.registry,
        &reaction.receiver_id,
        &ServerEvent::MessageReaction {
            sender_id: sender_id.to_string(),
            message_id: reaction.message_id,
            emoji: reaction.emoji,
            removed: reaction.removed,
        },
    );
}

fn handle_delete_message(
    state: &AppState,
    sender_id: &str,
    tx: &ConnectionSender,
    del: DeleteMessage,
) {
    if del.receiver_id.is_empty() || del.message_id.is_empty() {
        protocol::send_error(
            tx,
            ERR_MALFORMED,
            "deleteMessage requires receiverId and messageId",
        );
        return;
    }

    send_to_user(
        &state.registry,
        &del.receiver_id,
        &ServerEvent::MessageDeleted {
            sender_id: sender_id.to_string(),
            message_id: del.message_id,
        },
    );
}

fn handle_edit_message(
    state: &AppState,
    sender_id: &str,
    tx: &ConnectionSender,
    edit: EditMessage,
) {
    if edit.receiver_id.is_empty() || edit.message_id.is_empty() || edit.body.is_empty() {
        protocol::send_error(
            tx,
            ERR_MALFORMED,
            "editMessage requires receiverId, messageId and body",
        );
        return;
    }

    send_to_user(
        &state.registry,
        &edit.receiver_id,
        &ServerEvent::MessageEdited {
            sender_id: sender_id.to_string(),
            message_id: edit.message_id,
            body: edit.body,
        },
    );
}

/// Never rate-limited: low frequency and reliability matters more than
/// throttling. Delivered to the target user only.
fn handle_friend_request_sent(
    state: &AppState,
    sender_id: &str,
    tx: &ConnectionSender,
    req: FriendRequestSent,
) {
    if req.to_user_id.is_empty() || req.request_id.is_empty() {
        protocol::send_error(
            tx,
            ERR_MALFORMED,
            "friendRequestSent requires toUserId and requestId",
        );
        return;
    }

    send_to_user(
        &state.registry,
        &req.to_user_id,
        &ServerEvent::FriendRequestReceived {
            from_user_id: sender_id.to_string(),
            request_id: req.request_id,
        },
    );
}

fn handle_friend_request_accepted(
    state: &AppState,
    sender_id: &str,
    tx: &ConnectionSender,
    req: FriendRequestAccepted,
) {
    if req.to_user_id.is_empty() || req.request_id.is_empty() {
        protocol::send_error(
            tx,
            ERR_MALFORMED,
            "friendRequestAccepted requires toUserId and requestId",
        );
        return;
    }

    send_to_user(
        &state.registry,
        &req.to_user_id,
        &ServerEvent::FriendRequestAccepted {
            by_user_id: sender_id.to_string(),
            request_id: req.request_id,
        },
    );
}
