//! Clock and id generation.
//!
//! DESIGN
//! ======
//! Both services are single-process, so process-local monotonic counters are
//! sufficient for uniqueness. Task ids use the `task-N` form; chat message
//! ids are bare integers so clients can order frames cheaply.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Monotonic id source shared across the process.
#[derive(Clone)]
pub struct IdGen {
    inner: Arc<IdGenInner>,
}

struct IdGenInner {
    tasks: AtomicU64,
    messages: AtomicU64,
}

impl IdGen {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(IdGenInner { tasks: AtomicU64::new(0), messages: AtomicU64::new(0) }) }
    }

    /// Next task id, unique for the service's lifetime.
    #[must_use]
    pub fn next_task_id(&self) -> String {
        let n = self.inner.tasks.fetch_add(1, Ordering::Relaxed) + 1;
        format!("task-{n}")
    }

    /// Next chat message id. Strictly increasing, starting at 1.
    #[must_use]
    pub fn next_message_id(&self) -> u64 {
        self.inner.messages.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
