//! Operation state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation state.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Retrying -> Pending (after the backoff delay)
/// - Pending -> Processing -> Failed (permanent error or retry budget exhausted)
///
/// Completed and Failed are terminal. Failed may trigger compensation as a
/// side effect, but never moves again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    /// Waiting to be dispatched.
    Pending,

    /// Dispatched to a processor.
    Processing,

    /// Failed with a retryable error; waiting for the backoff delay.
    Retrying,

    /// Processed successfully. Pruned after a short grace period.
    Completed,

    /// Abandoned. Kept for inspection until explicitly cleared.
    Failed,
}

impl OperationState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationState::Completed | OperationState::Failed)
    }

    /// Can the scheduler pick this operation up?
    pub fn is_schedulable(self) -> bool {
        matches!(self, OperationState::Pending | OperationState::Retrying)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationState::Pending => "PENDING",
            OperationState::Processing => "PROCESSING",
            OperationState::Retrying => "RETRYING",
            OperationState::Completed => "COMPLETED",
            OperationState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
