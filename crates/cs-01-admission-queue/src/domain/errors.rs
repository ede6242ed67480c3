//! Error types for the Admission Queue

use std::time::Duration;
use thiserror::Error;

/// Errors returned to callers of `AdmissionQueue::submit`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// LOW priority task refused because the waiting queue is full
    #[error("Admission queue saturated: {pending} tasks pending (max {max_queued})")]
    Saturated { pending: usize, max_queued: usize },

    /// Task waited or ran longer than the configured bound.
    ///
    /// The underlying work may still complete; callers must re-query state.
    #[error("Task exceeded admission timeout of {timeout:?}")]
    Timeout { timeout: Duration },

    /// Task panicked or was aborted while holding a slot
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

impl QueueError {
    /// Saturation and timeouts can be retried with no special handling.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::Saturated { .. } | QueueError::Timeout { .. })
    }
}
