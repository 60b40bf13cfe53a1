//! Message router — interprets inbound frames for a session.
//!
//! DESIGN
//! ======
//! Handlers never touch the socket. Direct replies (confirmations, errors)
//! go onto session outbound queues; room traffic goes through the registry
//! fan-out. The one thing the gateway must act on — a successful join — is
//! reported back as an outcome carrying the new subscriber endpoint.
//!
//! Every relayed frame is stamped server-side: monotonic id, timestamp, and
//! the authenticated sender, regardless of what the client claimed.

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::message::{ChatMessage, MessageType};
use crate::state::AppState;

/// What the gateway must do after an inbound frame was handled.
pub enum RouterOutcome {
    /// Nothing; any replies are already queued.
    None,
    /// The sender joined (or moved to) a room; swap the room subscription.
    Joined {
        room_id: String,
        receiver: broadcast::Receiver<ChatMessage>,
    },
}

/// Dispatch one inbound frame from `sender`.
pub fn dispatch(state: &AppState, sender: &str, inbound: ChatMessage) -> RouterOutcome {
    if !inbound.kind.is_client_originated() {
        // Server-only types; clients must not originate them.
        state.metrics.record_rejected_inbound();
        debug!(%sender, kind = ?inbound.kind, "dropped client frame with server-only type");
        return RouterOutcome::None;
    }

    match inbound.kind {
        MessageType::JoinRoom => handle_join_room(state, sender, &inbound),
        MessageType::Chat => handle_chat(state, sender, inbound),
        MessageType::Private => handle_private(state, sender, inbound),
        // Filtered above; arm kept for exhaustiveness.
        MessageType::System | MessageType::Presence => RouterOutcome::None,
    }
}

fn handle_join_room(state: &AppState, sender: &str, inbound: &ChatMessage) -> RouterOutcome {
    let room_id = inbound.content.clone();
    let receiver = state.rooms.join_or_move(sender, &room_id);

    let confirmation = ChatMessage::system(&state.ids, format!("You joined room: {room_id}"));
    state.sessions.push_to_user(sender, confirmation);

    RouterOutcome::Joined { room_id, receiver }
}

fn handle_chat(state: &AppState, sender: &str, inbound: ChatMessage) -> RouterOutcome {
    let Some(room_id) = state.rooms.current_room(sender) else {
        let error = ChatMessage::system(&state.ids, "You must join a room first");
        state.sessions.push_to_user(sender, error);
        return RouterOutcome::None;
    };

    let message = inbound.stamped(&state.ids, sender);
    info!(%sender, %room_id, "chat message");
    state.rooms.broadcast(&room_id, message);
    RouterOutcome::None
}

fn handle_private(state: &AppState, sender: &str, inbound: ChatMessage) -> RouterOutcome {
    let target = inbound.target.clone();
    let Some(target) = target.filter(|t| state.sessions.contains(t)) else {
        // Absent target reports the literal "null", matching the wire text
        // clients already key on.
        let name = inbound.target.as_deref().unwrap_or("null");
        let error = ChatMessage::system(&state.ids, format!("User {name} not found"));
        state.sessions.push_to_user(sender, error);
        return RouterOutcome::None;
    };

    let message = inbound.stamped(&state.ids, sender);
    state.sessions.push_to_user(&target, message);

    let confirmation = ChatMessage::system(&state.ids, format!("Private message sent to {target}"));
    state.sessions.push_to_user(sender, confirmation);

    info!(%sender, %target, "private message delivered");
    RouterOutcome::None
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
