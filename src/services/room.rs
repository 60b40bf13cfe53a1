//! Room registry — membership and per-room broadcast fan-out.
//!
//! DESIGN
//! ======
//! One write lock guards both indices (room → members, user → room) so a
//! join-or-move is atomic: the old room's "left" presence, the membership
//! swap, and the new room's "joined" presence cannot interleave with another
//! user's move. Delivery itself is lock-free: each subscriber owns a
//! `broadcast::Receiver` and drains it in its own gateway task.
//!
//! Fan-out channels are bounded; a subscriber that falls behind loses the
//! oldest undelivered frames (`RecvError::Lagged`), which the gateway counts.
//! Rooms are created lazily on first join and destroyed with the last leave,
//! under the same lock.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::info;

use crate::ids::IdGen;
use crate::message::ChatMessage;

struct Room {
    members: HashSet<String>,
    tx: broadcast::Sender<ChatMessage>,
}

impl Room {
    fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self { members: HashSet::new(), tx }
    }
}

#[derive(Default)]
struct RegistryInner {
    rooms: HashMap<String, Room>,
    /// user id → room id. Invariant: user is in that room's member set.
    user_rooms: HashMap<String, String>,
}

#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    buffer: usize,
    ids: IdGen,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(buffer: usize, ids: IdGen) -> Self {
        Self { inner: Arc::new(RwLock::new(RegistryInner::default())), buffer, ids }
    }

    /// Move `user_id` into `room_id`: leave the current room (with a "left"
    /// presence), join the new one (with a "joined" presence), and return the
    /// subscriber endpoint. The receiver is subscribed before the joined
    /// presence is emitted, so the joiner sees its own announcement.
    pub fn join_or_move(&self, user_id: &str, room_id: &str) -> broadcast::Receiver<ChatMessage> {
        let mut guard = self.inner.write().unwrap();
        let inner = &mut *guard;

        if let Some(old_room_id) = inner.user_rooms.remove(user_id) {
            Self::remove_member(inner, &old_room_id, user_id, &self.ids);
        }

        let room = inner
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(self.buffer));
        room.members.insert(user_id.to_string());
        let receiver = room.tx.subscribe();

        let joined = ChatMessage::presence(&self.ids, format!("{user_id} joined the room"));
        let _ = room.tx.send(joined);
        let members = room.members.len();

        inner.user_rooms.insert(user_id.to_string(), room_id.to_string());
        info!(%user_id, %room_id, members, "user joined room");
        receiver
    }

    /// Leave the current room, if any, emitting a "left" presence to it.
    /// Returns the room that was left.
    pub fn leave(&self, user_id: &str) -> Option<String> {
        let mut guard = self.inner.write().unwrap();
        let inner = &mut *guard;
        let room_id = inner.user_rooms.remove(user_id)?;
        Self::remove_member(inner, &room_id, user_id, &self.ids);
        info!(%user_id, %room_id, "user left room");
        Some(room_id)
    }

    /// Enqueue a frame on the room's fan-out. Returns the number of
    /// subscribers it reached; unknown rooms deliver to nobody.
    pub fn broadcast(&self, room_id: &str, message: ChatMessage) -> usize {
        let inner = self.inner.read().unwrap();
        match inner.rooms.get(room_id) {
            Some(room) => room.tx.send(message).unwrap_or(0),
            None => 0,
        }
    }

    #[must_use]
    pub fn current_room(&self, user_id: &str) -> Option<String> {
        self.inner.read().unwrap().user_rooms.get(user_id).cloned()
    }

    /// Fresh subscriber endpoint for the user's current room. Used when a
    /// new connection supersedes an old one and inherits its membership.
    #[must_use]
    pub fn resubscribe(&self, user_id: &str) -> Option<broadcast::Receiver<ChatMessage>> {
        let inner = self.inner.read().unwrap();
        let room_id = inner.user_rooms.get(user_id)?;
        Some(inner.rooms.get(room_id)?.tx.subscribe())
    }

    #[must_use]
    pub fn member_count(&self, room_id: &str) -> usize {
        self.inner
            .read()
            .unwrap()
            .rooms
            .get(room_id)
            .map_or(0, |room| room.members.len())
    }

    #[must_use]
    pub fn room_exists(&self, room_id: &str) -> bool {
        self.inner.read().unwrap().rooms.contains_key(room_id)
    }

    /// Drop a member, announce it, and destroy the room when it empties.
    /// Must run under the write lock so destruction is atomic with the leave.
    fn remove_member(inner: &mut RegistryInner, room_id: &str, user_id: &str, ids: &IdGen) {
        let Some(room) = inner.rooms.get_mut(room_id) else {
            return;
        };
        room.members.remove(user_id);
        let left = ChatMessage::presence(ids, format!("{user_id} left the room"));
        let _ = room.tx.send(left);
        if room.members.is_empty() {
            inner.rooms.remove(room_id);
            info!(%room_id, "destroyed empty room");
        }
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
