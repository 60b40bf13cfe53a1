//! Task model — requests, results, and the record clients poll.
//!
//! DESIGN
//! ======
//! `TaskRecord` is the single response shape for every dispatcher endpoint.
//! Status moves exactly once, from PROCESSING to a terminal state; the
//! `complete`/`fail` transitions keep the field invariants in one place so
//! the table never has to reason about them.
//!
//! JSON uses camelCase field names (`taskId`, `errorMessage`, ...) to match
//! the wire contract.

use serde::{Deserialize, Serialize};

use crate::ids::now_ms;

/// Fixed success message carried by every completed result.
pub const RESULT_MESSAGE: &str = "Data processed successfully";

// =============================================================================
// REQUEST / RESULT
// =============================================================================

/// Inbound processing request. Immutable once accepted; complexity is
/// clamped to [1, 10] at the dispatch boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataProcessingRequest {
    #[serde(default)]
    pub data: String,
    #[serde(default = "default_complexity")]
    pub complexity: i32,
}

fn default_complexity() -> i32 {
    1
}

impl DataProcessingRequest {
    /// Clamp complexity into the supported [1, 10] scale.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.complexity = self.complexity.clamp(1, 10);
        self
    }
}

/// Output of one unit of synthetic work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProcessingResult {
    /// Derived from the request data: `data + " - processed"`.
    pub processed_data: String,
    pub message: String,
    /// Epoch milliseconds at the moment processing finished.
    pub timestamp: i64,
    pub complexity: i32,
}

// =============================================================================
// STATUS
// =============================================================================

/// Task lifecycle state. PROCESSING moves to exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// Record created when a request is accepted; the polling handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub task_id: String,
    pub status: TaskStatus,
    /// Present iff status is COMPLETED.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<DataProcessingResult>,
    /// Present iff status is FAILED.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: i64,
    /// Set iff status is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    pub original_request: DataProcessingRequest,
}

impl TaskRecord {
    /// Fresh PROCESSING record for an accepted request.
    #[must_use]
    pub fn processing(task_id: impl Into<String>, request: DataProcessingRequest) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Processing,
            result: None,
            error_message: None,
            created_at: now_ms(),
            completed_at: None,
            original_request: request,
        }
    }

    /// Transition to COMPLETED. Caller must hold the table's guard and have
    /// verified the current status is PROCESSING.
    pub(crate) fn complete(&mut self, result: DataProcessingResult, at: i64) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.error_message = None;
        self.completed_at = Some(at);
    }

    /// Transition to FAILED. Same preconditions as [`TaskRecord::complete`].
    pub(crate) fn fail(&mut self, message: String, at: i64) {
        self.status = TaskStatus::Failed;
        self.error_message = Some(message);
        self.result = None;
        self.completed_at = Some(at);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request(data: &str, complexity: i32) -> DataProcessingRequest {
        DataProcessingRequest { data: data.into(), complexity }
    }

    #[test]
    fn complexity_clamps_low_and_high() {
        assert_eq!(request("x", 0).clamped().complexity, 1);
        assert_eq!(request("x", 11).clamped().complexity, 10);
        assert_eq!(request("x", 15).clamped().complexity, 10);
        assert_eq!(request("x", 5).clamped().complexity, 5);
    }

    #[test]
    fn complexity_defaults_to_one() {
        let req: DataProcessingRequest = serde_json::from_str(r#"{"data":"x"}"#).unwrap();
        assert_eq!(req.complexity, 1);
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&TaskStatus::Processing).unwrap(), "\"PROCESSING\"");
        assert_eq!(serde_json::to_string(&TaskStatus::Completed).unwrap(), "\"COMPLETED\"");
        assert_eq!(serde_json::to_string(&TaskStatus::Failed).unwrap(), "\"FAILED\"");
    }

    #[test]
    fn record_json_uses_camel_case_field_names() {
        let record = TaskRecord::processing("task-1", request("payload", 3));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json.get("taskId").and_then(|v| v.as_str()), Some("task-1"));
        assert!(json.get("createdAt").is_some());
        assert!(json.get("originalRequest").is_some());
        // Absent optionals are omitted entirely.
        assert!(json.get("result").is_none());
        assert!(json.get("errorMessage").is_none());
        assert!(json.get("completedAt").is_none());
    }

    #[test]
    fn complete_sets_result_and_clears_error() {
        let mut record = TaskRecord::processing("task-1", request("payload", 2));
        let result = DataProcessingResult {
            processed_data: "payload - processed".into(),
            message: RESULT_MESSAGE.into(),
            timestamp: 1,
            complexity: 2,
        };
        record.complete(result, 42);
        assert_eq!(record.status, TaskStatus::Completed);
        assert!(record.result.is_some());
        assert!(record.error_message.is_none());
        assert_eq!(record.completed_at, Some(42));
    }

    #[test]
    fn fail_sets_error_and_clears_result() {
        let mut record = TaskRecord::processing("task-1", request("payload", 2));
        record.fail("boom".into(), 42);
        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.result.is_none());
        assert_eq!(record.error_message.as_deref(), Some("boom"));
        assert_eq!(record.completed_at, Some(42));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }
}
