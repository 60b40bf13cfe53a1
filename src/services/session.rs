//! Session table — active chat sessions keyed by user id.
//!
//! DESIGN
//! ======
//! Each session owns a bounded outbound FIFO with drop-oldest overflow. The
//! table lock is only held to look entries up; pushes go through a cloned
//! queue handle, so delivery to one slow session never blocks another.
//!
//! A duplicate user id supersedes the older session: the old connection gets
//! a system notice on its queue and an evict signal its gateway selects on.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::warn;
use uuid::Uuid;

use crate::message::ChatMessage;
use crate::metrics::Metrics;

// =============================================================================
// OUTBOUND QUEUE
// =============================================================================

/// Bounded FIFO of outbound frames with drop-oldest overflow.
pub struct OutboundQueue {
    messages: Mutex<VecDeque<ChatMessage>>,
    notify: Notify,
    capacity: usize,
}

impl OutboundQueue {
    fn new(capacity: usize) -> Self {
        Self { messages: Mutex::new(VecDeque::new()), notify: Notify::new(), capacity }
    }

    /// Enqueue a frame. Returns true when an older frame was discarded to
    /// make room.
    pub fn push(&self, message: ChatMessage) -> bool {
        let dropped = {
            let mut messages = self.messages.lock().unwrap();
            let dropped = if messages.len() >= self.capacity {
                messages.pop_front();
                true
            } else {
                false
            };
            messages.push_back(message);
            dropped
        };
        self.notify.notify_one();
        dropped
    }

    /// Non-blocking dequeue.
    #[must_use]
    pub fn try_recv(&self) -> Option<ChatMessage> {
        self.messages.lock().unwrap().pop_front()
    }

    /// Dequeue the next frame, waiting if the queue is empty. Cancel-safe:
    /// a frame is only taken when this future completes.
    pub async fn recv(&self) -> ChatMessage {
        loop {
            let notified = self.notify.notified();
            if let Some(message) = self.try_recv() {
                return message;
            }
            notified.await;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// SESSION TABLE
// =============================================================================

struct SessionEntry {
    connection_id: Uuid,
    outbound: Arc<OutboundQueue>,
    evict: Arc<Notify>,
}

/// The gateway's view of its own registration.
pub struct SessionHandle {
    pub user_id: String,
    pub connection_id: Uuid,
    pub outbound: Arc<OutboundQueue>,
    /// Signalled when a newer connection for the same user id takes over.
    pub evict: Arc<Notify>,
}

#[derive(Clone)]
pub struct SessionTable {
    inner: Arc<Mutex<HashMap<String, SessionEntry>>>,
    capacity: usize,
    metrics: Arc<Metrics>,
}

impl SessionTable {
    #[must_use]
    pub fn new(capacity: usize, metrics: Arc<Metrics>) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), capacity, metrics }
    }

    /// Register a session for `user_id`. An existing session for the same id
    /// is superseded: it receives `supersede_notice` and its evict signal.
    pub fn register(&self, user_id: &str, supersede_notice: ChatMessage) -> SessionHandle {
        let entry = SessionEntry {
            connection_id: Uuid::new_v4(),
            outbound: Arc::new(OutboundQueue::new(self.capacity)),
            evict: Arc::new(Notify::new()),
        };
        let handle = SessionHandle {
            user_id: user_id.to_string(),
            connection_id: entry.connection_id,
            outbound: Arc::clone(&entry.outbound),
            evict: Arc::clone(&entry.evict),
        };

        let previous = self.inner.lock().unwrap().insert(user_id.to_string(), entry);
        if let Some(old) = previous {
            warn!(%user_id, "duplicate connect; superseding older session");
            old.outbound.push(supersede_notice);
            old.evict.notify_one();
        }
        handle
    }

    /// Remove the session, but only if it is still the registered connection.
    /// A superseded gateway cleaning up must not evict its successor.
    pub fn remove(&self, user_id: &str, connection_id: Uuid) -> bool {
        let mut sessions = self.inner.lock().unwrap();
        match sessions.get(user_id) {
            Some(entry) if entry.connection_id == connection_id => {
                sessions.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Enqueue a frame for a user. Returns whether the user had a session;
    /// an absent user is a no-op.
    pub fn push_to_user(&self, user_id: &str, message: ChatMessage) -> bool {
        let outbound = {
            let sessions = self.inner.lock().unwrap();
            sessions.get(user_id).map(|entry| Arc::clone(&entry.outbound))
        };
        let Some(outbound) = outbound else {
            return false;
        };
        if outbound.push(message) {
            self.metrics.record_session_drop();
            warn!(%user_id, "session outbound queue full; dropped oldest frame");
        }
        true
    }

    #[must_use]
    pub fn contains(&self, user_id: &str) -> bool {
        self.inner.lock().unwrap().contains_key(user_id)
    }

    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Enqueue a copy of `message` for every connected session. Used for the
    /// shutdown notice.
    pub fn push_to_all(&self, message: &ChatMessage) {
        let queues: Vec<(String, Arc<OutboundQueue>)> = {
            let sessions = self.inner.lock().unwrap();
            sessions
                .iter()
                .map(|(user_id, entry)| (user_id.clone(), Arc::clone(&entry.outbound)))
                .collect()
        };
        for (user_id, outbound) in queues {
            if outbound.push(message.clone()) {
                self.metrics.record_session_drop();
                warn!(%user_id, "session outbound queue full; dropped oldest frame");
            }
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
