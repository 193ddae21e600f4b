//! Operation: one unit of deferred work.

use std::cmp::Ordering;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::ids::{OperationId, OperationType};
use super::state::OperationState;
use crate::queue::RetryPolicy;

/// A durable unit of deferred work.
///
/// Design:
/// - Identity, type, payload, priority and retry budget are fixed at enqueue.
/// - `state` / `retry_count` / `updated_at` change only through the
///   crate-private mutators, which the orchestrator calls.
/// - Invariant: `retry_count <= max_retries`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    id: OperationId,
    op_type: OperationType,
    data: serde_json::Value,
    priority: i32,
    max_retries: u32,
    retry_count: u32,
    state: OperationState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Operation {
    /// Create a new PENDING operation.
    pub fn new(
        id: OperationId,
        op_type: OperationType,
        data: serde_json::Value,
        priority: i32,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            op_type,
            data,
            priority,
            max_retries,
            retry_count: 0,
            state: OperationState::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild an operation from persisted parts.
    ///
    /// `retry_count` is clamped to `max_retries` so a hand-edited or corrupt
    /// record cannot break the retry invariant.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: OperationId,
        op_type: OperationType,
        data: serde_json::Value,
        priority: i32,
        max_retries: u32,
        retry_count: u32,
        state: OperationState,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            op_type,
            data,
            priority,
            max_retries,
            retry_count: retry_count.min(max_retries),
            state,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub fn op_type(&self) -> &OperationType {
        &self.op_type
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Is there retry budget left?
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Backoff delay before the next retry.
    pub fn retry_delay(&self, policy: &RetryPolicy) -> Duration {
        policy.delay_for(self.retry_count)
    }

    /// Queue ordering: priority descending, then created_at ascending, then
    /// id (ULID) ascending.
    pub fn queue_order(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.ulid().cmp(&other.id.ulid()))
            .then_with(|| self.id.cmp(&other.id))
    }

    pub(crate) fn increment_retry_count(&mut self, now: DateTime<Utc>) {
        if self.retry_count < self.max_retries {
            self.retry_count += 1;
        }
        self.updated_at = now;
    }

    pub(crate) fn set_state(&mut self, state: OperationState, now: DateTime<Utc>) {
        self.state = state;
        self.updated_at = now;
    }
}

/// Per-enqueue overrides. Unset fields fall back to the queue config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    pub priority: Option<i32>,
    pub max_retries: Option<u32>,
}

impl EnqueueOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}
