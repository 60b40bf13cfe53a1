//! `ChatMessage` — the wire envelope for the chat bus, both directions.
//!
//! DESIGN
//! ======
//! Clients may only originate `chat`, `private`, and `join_room`; the server
//! overwrites `sender` with the connection's user id and stamps `id` and
//! `timestamp` on everything it emits. `system` and `presence` frames are
//! server-originated with the literal sender `"system"`.

use serde::{Deserialize, Serialize};

use crate::ids::{now_ms, IdGen};

/// Sender label on server-originated frames.
pub const SYSTEM_SENDER: &str = "system";

// =============================================================================
// TYPES
// =============================================================================

/// Message discriminator. Inbound from clients: `chat`, `private`,
/// `join_room` only; the server emits any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Chat,
    Private,
    JoinRoom,
    System,
    Presence,
}

impl MessageType {
    /// Whether clients are allowed to originate this type.
    #[must_use]
    pub fn is_client_originated(self) -> bool {
        matches!(self, MessageType::Chat | MessageType::Private | MessageType::JoinRoom)
    }
}

/// The universal chat envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned monotonic id. Absent on inbound frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Overwritten by the server with the authenticated user id.
    #[serde(default)]
    pub sender: String,
    /// Required iff kind is `private`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Room id for `join_room`, body for `chat`/`private`, note otherwise.
    #[serde(default)]
    pub content: String,
    /// Epoch milliseconds, server-assigned on every outbound frame.
    #[serde(default)]
    pub timestamp: i64,
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

impl ChatMessage {
    /// Server-originated `system` message, fully stamped.
    pub fn system(ids: &IdGen, content: impl Into<String>) -> Self {
        Self {
            id: Some(ids.next_message_id()),
            kind: MessageType::System,
            sender: SYSTEM_SENDER.into(),
            target: None,
            content: content.into(),
            timestamp: now_ms(),
        }
    }

    /// Server-originated `presence` announcement, fully stamped.
    pub fn presence(ids: &IdGen, content: impl Into<String>) -> Self {
        Self {
            id: Some(ids.next_message_id()),
            kind: MessageType::Presence,
            sender: SYSTEM_SENDER.into(),
            target: None,
            content: content.into(),
            timestamp: now_ms(),
        }
    }

    /// Stamp an inbound frame for relay: server id, server timestamp, and the
    /// authenticated sender.
    #[must_use]
    pub fn stamped(mut self, ids: &IdGen, sender: &str) -> Self {
        self.id = Some(ids.next_message_id());
        self.sender = sender.to_string();
        self.timestamp = now_ms();
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================
