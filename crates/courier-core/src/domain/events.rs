//! Events - queue lifecycle notifications
//!
//! UI / analytics 側のコラボレータが購読するイベント。
//! キュー本体のロジックはこれらに依存しません。

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::{OperationId, OperationType};

/// Why an operation ended up FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No processor was registered for the operation type.
    NoProcessor,
    /// The processor marked the error as not retryable.
    Permanent,
    /// The retry budget ran out.
    RetriesExhausted,
}

/// Lifecycle notification emitted by the queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    Enqueued {
        id: OperationId,
        op_type: OperationType,
        priority: i32,
        at: DateTime<Utc>,
    },
    ProcessingStarted {
        id: OperationId,
        op_type: OperationType,
        /// 1-based attempt number.
        attempt: u32,
        at: DateTime<Utc>,
    },
    Completed {
        id: OperationId,
        op_type: OperationType,
        result: Option<serde_json::Value>,
        at: DateTime<Utc>,
    },
    RetryScheduled {
        id: OperationId,
        op_type: OperationType,
        #[serde(with = "duration_ms")]
        delay: Duration,
        retry_count: u32,
        error: String,
        at: DateTime<Utc>,
    },
    Failed {
        id: OperationId,
        op_type: OperationType,
        error: String,
        kind: FailureKind,
        at: DateTime<Utc>,
    },
    Removed {
        id: OperationId,
        op_type: OperationType,
        at: DateTime<Utc>,
    },
    Cleared {
        removed: usize,
        at: DateTime<Utc>,
    },
    BackOnline {
        at: DateTime<Utc>,
    },
    WentOffline {
        at: DateTime<Utc>,
    },
}

impl QueueEvent {
    /// The operation this event is about, if any.
    pub fn operation_id(&self) -> Option<&OperationId> {
        match self {
            QueueEvent::Enqueued { id, .. }
            | QueueEvent::ProcessingStarted { id, .. }
            | QueueEvent::Completed { id, .. }
            | QueueEvent::RetryScheduled { id, .. }
            | QueueEvent::Failed { id, .. }
            | QueueEvent::Removed { id, .. } => Some(id),
            QueueEvent::Cleared { .. }
            | QueueEvent::BackOnline { .. }
            | QueueEvent::WentOffline { .. } => None,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            QueueEvent::Enqueued { at, .. }
            | QueueEvent::ProcessingStarted { at, .. }
            | QueueEvent::Completed { at, .. }
            | QueueEvent::RetryScheduled { at, .. }
            | QueueEvent::Failed { at, .. }
            | QueueEvent::Removed { at, .. }
            | QueueEvent::Cleared { at, .. }
            | QueueEvent::BackOnline { at }
            | QueueEvent::WentOffline { at } => *at,
        }
    }

    /// Short snake_case name, handy for logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::Enqueued { .. } => "enqueued",
            QueueEvent::ProcessingStarted { .. } => "processing_started",
            QueueEvent::Completed { .. } => "completed",
            QueueEvent::RetryScheduled { .. } => "retry_scheduled",
            QueueEvent::Failed { .. } => "failed",
            QueueEvent::Removed { .. } => "removed",
            QueueEvent::Cleared { .. } => "cleared",
            QueueEvent::BackOnline { .. } => "back_online",
            QueueEvent::WentOffline { .. } => "went_offline",
        }
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
