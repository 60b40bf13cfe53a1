//! WebSocket gateway — one task per chat connection.
//!
//! DESIGN
//! ======
//! On upgrade, the user id comes from the `userId` query param (or an
//! `anonymous-<epochMs>` fallback), the session is registered, and the loop
//! selects over four sources:
//! - inbound socket frames → parse + route (parse failures answer with a
//!   system error and keep the session open)
//! - the session's outbound FIFO → written to the socket in order
//! - the current room's fan-out stream → written to the socket; lag is
//!   counted, not fatal
//! - the evict signal → a newer connection for the same user took over
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register session, queue welcome + connected-count presence
//! 2. Frames flow until peer close, write error, or eviction
//! 3. Normal close → room "left" presence, then session removal
//! 4. Evicted close → no leave: the user is still connected elsewhere and
//!    the new gateway resubscribed to their room

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::ids::now_ms;
use crate::message::ChatMessage;
use crate::services::router::{self, RouterOutcome};
use crate::services::session::SessionHandle;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_chat(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = params
        .get("userId")
        .cloned()
        .unwrap_or_else(|| format!("anonymous-{}", now_ms()));

    ws.on_upgrade(move |socket| run_chat(socket, state, user_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_chat(mut socket: WebSocket, state: AppState, user_id: String) {
    let (session, mut room_rx) = open_session(&state, &user_id);
    let mut evicted = false;

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                let Some(Ok(frame)) = inbound else { break };
                match frame {
                    Message::Text(text) => {
                        if let Some(rx) = process_inbound_text(&state, &user_id, &text) {
                            room_rx = Some(rx);
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            outbound = session.outbound.recv() => {
                if send_message(&mut socket, &outbound).await.is_err() {
                    break;
                }
            }
            room_msg = recv_room(&mut room_rx) => {
                match room_msg {
                    Ok(message) => {
                        if send_message(&mut socket, &message).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        state.metrics.record_room_drops(n);
                        warn!(%user_id, lagged = n, "room fan-out lagged; oldest frames dropped");
                    }
                    Err(RecvError::Closed) => {
                        // Room was destroyed out from under us (last member
                        // moved away elsewhere).
                        room_rx = None;
                    }
                }
            }
            _ = session.evict.notified() => {
                evicted = true;
                break;
            }
        }
    }

    close_session(&state, &session, evicted);
}

// =============================================================================
// SESSION OPEN / CLOSE
// =============================================================================

/// Register the session and queue the connect-time frames. Returns the
/// handle and, when a superseded connection left the user mid-room, a fresh
/// subscription to that room.
fn open_session(
    state: &AppState,
    user_id: &str,
) -> (SessionHandle, Option<broadcast::Receiver<ChatMessage>>) {
    let notice = ChatMessage::system(&state.ids, "Signed in from another connection; closing this one");
    let session = state.sessions.register(user_id, notice);

    let welcome = ChatMessage::system(&state.ids, format!("Welcome to the chat, {user_id}!"));
    state.sessions.push_to_user(user_id, welcome);

    let count = state.sessions.connected_count();
    let presence = ChatMessage::presence(&state.ids, format!("Connected users: {count}"));
    state.sessions.push_to_user(user_id, presence);

    let room_rx = state.rooms.resubscribe(user_id);
    info!(%user_id, connection_id = %session.connection_id, "chat: client connected");
    (session, room_rx)
}

/// Tear the session down. The "left" presence goes out before the table
/// eviction; a superseded connection leaves membership and table entry to
/// its successor.
fn close_session(state: &AppState, session: &SessionHandle, evicted: bool) {
    if evicted {
        info!(user_id = %session.user_id, "chat: session superseded by newer connection");
        return;
    }
    state.rooms.leave(&session.user_id);
    state.sessions.remove(&session.user_id, session.connection_id);
    info!(user_id = %session.user_id, "chat: client disconnected");
}

// =============================================================================
// FRAME HANDLING
// =============================================================================

/// Parse and route one inbound text frame. Returns a new room subscription
/// when the frame was a successful join. Kept socket-free so tests can
/// drive the gateway through queues and receivers.
fn process_inbound_text(
    state: &AppState,
    user_id: &str,
    text: &str,
) -> Option<broadcast::Receiver<ChatMessage>> {
    let inbound: ChatMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(%user_id, error = %e, "chat: malformed inbound frame");
            let error = ChatMessage::system(&state.ids, "malformed frame");
            state.sessions.push_to_user(user_id, error);
            return None;
        }
    };

    match router::dispatch(state, user_id, inbound) {
        RouterOutcome::Joined { receiver, .. } => Some(receiver),
        RouterOutcome::None => None,
    }
}

async fn send_message(socket: &mut WebSocket, message: &ChatMessage) -> Result<(), ()> {
    let json = match serde_json::to_string(message) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "chat: failed to serialize outbound frame");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Receive from the current room, or park forever when no room is joined.
async fn recv_room(
    rx: &mut Option<broadcast::Receiver<ChatMessage>>,
) -> Result<ChatMessage, RecvError> {
    match rx.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
