//! Task table — concurrent registry of task records.
//!
//! DESIGN
//! ======
//! A mutex-guarded map with O(1), await-free critical sections. Status
//! transitions are conditional on the current status being PROCESSING, so a
//! terminal state is sticky regardless of which side (SLA waiter, background
//! task, poller) touches the record last.
//!
//! Retrieval uses `get_and_maybe_remove`: a COMPLETED record is returned and
//! deleted in the same critical section, so a client never sees a completed
//! task twice and can never lose a record that is still in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ids::now_ms;
use crate::task::{DataProcessingResult, TaskRecord, TaskStatus};

#[derive(Clone)]
pub struct TaskTable {
    inner: Arc<Mutex<HashMap<String, TaskRecord>>>,
}

impl TaskTable {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Insert a fresh record. Returns false if the task id is already present.
    pub fn insert_initial(&self, record: TaskRecord) -> bool {
        let mut tasks = self.inner.lock().unwrap();
        if tasks.contains_key(&record.task_id) {
            return false;
        }
        tasks.insert(record.task_id.clone(), record);
        true
    }

    /// PROCESSING → COMPLETED. Returns false when the record is absent or
    /// already terminal.
    pub fn mark_completed(&self, task_id: &str, result: DataProcessingResult) -> bool {
        let mut tasks = self.inner.lock().unwrap();
        match tasks.get_mut(task_id) {
            Some(record) if record.status == TaskStatus::Processing => {
                record.complete(result, now_ms());
                true
            }
            _ => false,
        }
    }

    /// PROCESSING → FAILED. Returns false when the record is absent or
    /// already terminal.
    pub fn mark_failed(&self, task_id: &str, message: impl Into<String>) -> bool {
        let mut tasks = self.inner.lock().unwrap();
        match tasks.get_mut(task_id) {
            Some(record) if record.status == TaskStatus::Processing => {
                record.fail(message.into(), now_ms());
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.inner.lock().unwrap().get(task_id).cloned()
    }

    /// Return the record; if COMPLETED, also remove it atomically.
    /// PROCESSING and FAILED records stay in place.
    #[must_use]
    pub fn get_and_maybe_remove(&self, task_id: &str) -> Option<TaskRecord> {
        let mut tasks = self.inner.lock().unwrap();
        let record = tasks.get(task_id)?.clone();
        if record.status == TaskStatus::Completed {
            tasks.remove(task_id);
        }
        Some(record)
    }

    /// Snapshot of known task ids. Weakly consistent under concurrent mutation.
    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.inner.lock().unwrap().keys().cloned().collect()
    }

    /// Number of records still PROCESSING. Used by shutdown draining.
    #[must_use]
    pub fn processing_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == TaskStatus::Processing)
            .count()
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "task_table_test.rs"]
mod tests;
