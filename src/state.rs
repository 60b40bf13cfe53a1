//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor and
//! cloned into background tasks. It holds the three shared maps (task table,
//! session table, room registry), the id source, overflow counters, and the
//! processor seam. Clone is required by Axum — all inner fields are
//! Arc-wrapped or cheaply cloneable handles.

use std::sync::Arc;

use crate::config::Config;
use crate::ids::IdGen;
use crate::metrics::Metrics;
use crate::services::processor::Processor;
use crate::services::room::RoomRegistry;
use crate::services::session::SessionTable;
use crate::services::task_table::TaskTable;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ids: IdGen,
    pub tasks: TaskTable,
    pub sessions: SessionTable,
    pub rooms: RoomRegistry,
    pub metrics: Arc<Metrics>,
    /// The workload seam; tests substitute a mock.
    pub processor: Arc<dyn Processor>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, processor: Arc<dyn Processor>) -> Self {
        let ids = IdGen::new();
        let metrics = Arc::new(Metrics::new());
        Self {
            tasks: TaskTable::new(),
            sessions: SessionTable::new(config.session_buffer_size, Arc::clone(&metrics)),
            rooms: RoomRegistry::new(config.room_buffer_size, ids.clone()),
            ids,
            metrics,
            config,
            processor,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
