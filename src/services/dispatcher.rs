//! Dispatcher — runs the processor under an SLA without losing in-flight work.
//!
//! DESIGN
//! ======
//! `submit` inserts a PROCESSING record, spawns the processor as a detached
//! task, then races the task's completion signal against the SLA timer. The
//! detached task owns the terminal transition on the record; the request
//! handler only observes it. Cancelling the request future (client timeout,
//! disconnect) therefore never reaches the processor — their only link is
//! the shared record.
//!
//! The select is biased toward the completion signal so work that finishes
//! exactly at the deadline still reports as completed-within-SLA.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::state::AppState;
use crate::task::{DataProcessingRequest, TaskRecord, TaskStatus};

/// Outcome of a submit, mapped by the route layer onto 200/500/202.
pub enum SubmitOutcome {
    /// Work finished successfully before the deadline.
    CompletedWithinSla(TaskRecord),
    /// Work failed before the deadline.
    FailedWithinSla(TaskRecord),
    /// Deadline fired first; the record is a handle for later polling.
    AcceptedForBackground(TaskRecord),
}

/// Accept a request: start work immediately, wait up to the SLA, and return
/// whichever state the task is in.
pub async fn submit(state: &AppState, request: DataProcessingRequest) -> SubmitOutcome {
    let request = request.clamped();
    let task_id = state.ids.next_task_id();
    let record = TaskRecord::processing(task_id.clone(), request.clone());
    state.tasks.insert_initial(record.clone());
    info!(%task_id, complexity = request.complexity, "process request accepted; starting immediately");

    let (done_tx, done_rx) = oneshot::channel::<()>();
    {
        let processor = Arc::clone(&state.processor);
        let tasks = state.tasks.clone();
        let task_id = task_id.clone();
        // Detached on purpose: must survive cancellation of this handler.
        tokio::spawn(async move {
            match processor.run(&request).await {
                Ok(result) => {
                    if tasks.mark_completed(&task_id, result) {
                        info!(%task_id, "background processing completed");
                    }
                }
                Err(e) => {
                    if tasks.mark_failed(&task_id, e.to_string()) {
                        error!(%task_id, error = %e, "background processing failed");
                    }
                }
            }
            // Waiter may be gone after an SLA timeout; that is fine.
            let _ = done_tx.send(());
        });
    }

    let sla = Duration::from_millis(state.config.sla_ms);
    tokio::select! {
        biased;
        _ = done_rx => {
            let record = state.tasks.get(&task_id).unwrap_or(record);
            if record.status == TaskStatus::Failed {
                warn!(%task_id, "task failed within SLA");
                SubmitOutcome::FailedWithinSla(record)
            } else {
                info!(%task_id, sla_ms = state.config.sla_ms, "task completed within SLA");
                SubmitOutcome::CompletedWithinSla(record)
            }
        }
        () = tokio::time::sleep(sla) => {
            info!(%task_id, sla_ms = state.config.sla_ms, "SLA exceeded; returning handle, processing continues");
            let record = state.tasks.get(&task_id).unwrap_or(record);
            SubmitOutcome::AcceptedForBackground(record)
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;
