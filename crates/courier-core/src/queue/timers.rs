//! Delayed work keyed by due time.
//!
//! Retry wake-ups and completed-pruning are not callbacks: they are entries in
//! a min-heap that the orchestrator drains against the injected clock.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};

use crate::domain::OperationId;

/// What to do when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TimerKind {
    /// RETRYING -> PENDING.
    RetryWake,
    /// Drop a COMPLETED operation from the live queue.
    PruneCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Timer {
    pub due_at: DateTime<Utc>,
    pub id: OperationId,
    pub kind: TimerKind,
    /// Insertion order, so equal due times fire FIFO.
    seq: u64,
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering: earlier due times pop first from the max-heap.
        other
            .due_at
            .cmp(&self.due_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    heap: BinaryHeap<Timer>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_at: DateTime<Utc>, id: OperationId, kind: TimerKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Timer {
            due_at,
            id,
            kind,
            seq,
        });
    }

    /// Pop every timer due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<Timer> {
        let mut due = Vec::new();
        while let Some(timer) = self.heap.peek() {
            if timer.due_at > now {
                break;
            }
            if let Some(timer) = self.heap.pop() {
                due.push(timer);
            }
        }
        due
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|t| t.due_at)
    }

    /// Is a timer of `kind` armed for `id`?
    pub fn is_armed(&self, id: &OperationId, kind: TimerKind) -> bool {
        self.heap.iter().any(|t| t.kind == kind && &t.id == id)
    }

    /// Drop every timer for `id`.
    pub fn cancel(&mut self, id: &OperationId) {
        self.heap.retain(|t| &t.id != id);
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
