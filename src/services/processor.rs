//! Processor — executes one unit of synthetic work.
//!
//! DESIGN
//! ======
//! The workload is a deterministic sleep whose length is a pure function of
//! request complexity, run on the blocking pool so long tasks never occupy
//! the I/O workers. The trait seam exists so the dispatcher can be exercised
//! with a mock that completes in microseconds.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::ids::now_ms;
use crate::task::{DataProcessingRequest, DataProcessingResult, RESULT_MESSAGE};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("processing cancelled")]
    Cancelled,
    #[error("processing failed: {0}")]
    Failed(String),
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait]
pub trait Processor: Send + Sync {
    /// Run the workload to completion, or fail.
    async fn run(&self, request: &DataProcessingRequest) -> Result<DataProcessingResult, ProcessorError>;
}

// =============================================================================
// SYNTHETIC PROCESSOR
// =============================================================================

/// Production processor: sleeps `estimate_duration_ms(complexity)` on the
/// blocking pool, then derives the result from the request payload.
pub struct SyntheticProcessor;

#[async_trait]
impl Processor for SyntheticProcessor {
    async fn run(&self, request: &DataProcessingRequest) -> Result<DataProcessingResult, ProcessorError> {
        let request = request.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let duration_ms = estimate_duration_ms(request.complexity);
            info!(complexity = request.complexity, duration_ms, "processor: starting synthetic work");
            std::thread::sleep(Duration::from_millis(duration_ms));
            process_payload(&request)
        });

        match handle.await {
            Ok(result) => Ok(result),
            Err(e) if e.is_cancelled() => Err(ProcessorError::Cancelled),
            Err(e) => Err(ProcessorError::Failed(e.to_string())),
        }
    }
}

/// Deterministic duration in milliseconds for a complexity in [1, 10].
/// Linear from 6000 ms at complexity 1 up to 60000 ms at complexity 10.
#[must_use]
pub fn estimate_duration_ms(complexity: i32) -> u64 {
    let factor = f64::from(complexity - 1) / 9.0 * 0.9 + 0.1;
    (factor * 60_000.0).ceil() as u64
}

/// Pure derivation of the result from the request payload.
fn process_payload(request: &DataProcessingRequest) -> DataProcessingResult {
    DataProcessingResult {
        processed_data: format!("{} - processed", request.data),
        message: RESULT_MESSAGE.into(),
        timestamp: now_ms(),
        complexity: request.complexity,
    }
}

#[cfg(test)]
#[path = "processor_test.rs"]
mod tests;
