//! Overflow and rejection counters.
//!
//! Drops are never surfaced to clients synchronously; these counters are the
//! only place they become visible, alongside the warn-level log lines at the
//! drop sites.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters for the chat bus.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Room fan-out messages dropped for lagging subscribers (`room.drop_count`).
    room_drops: AtomicU64,
    /// Session outbound messages discarded by drop-oldest (`session.drop_count`).
    session_drops: AtomicU64,
    /// Inbound frames with server-only types, dropped by the router (`router.rejected`).
    router_rejected: AtomicU64,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_room_drops(&self, n: u64) {
        self.room_drops.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_session_drop(&self) {
        self.session_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_inbound(&self) {
        self.router_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn room_drop_count(&self) -> u64 {
        self.room_drops.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn session_drop_count(&self) -> u64 {
        self.session_drops.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn rejected_inbound_count(&self) -> u64 {
        self.router_rejected.load(Ordering::Relaxed)
    }
}

// =============================================================================
// TESTS
// =============================================================================
