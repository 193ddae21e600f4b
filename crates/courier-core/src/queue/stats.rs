use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{Operation, OperationState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub pending: usize,
    pub processing: usize,
    pub retrying: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StateCounts {
    fn bump(&mut self, state: OperationState) {
        match state {
            OperationState::Pending => self.pending += 1,
            OperationState::Processing => self.processing += 1,
            OperationState::Retrying => self.retrying += 1,
            OperationState::Completed => self.completed += 1,
            OperationState::Failed => self.failed += 1,
        }
    }
}

/// Snapshot of the live queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub by_state: StateCounts,
    pub by_type: BTreeMap<String, usize>,
    pub in_flight: usize,
    pub online: bool,
    pub running: bool,
}

impl QueueStats {
    pub(crate) fn collect<'a>(operations: impl IntoIterator<Item = &'a Operation>) -> Self {
        let mut stats = QueueStats::default();
        for op in operations {
            stats.total += 1;
            stats.by_state.bump(op.state());
            *stats.by_type.entry(op.op_type().to_string()).or_default() += 1;
        }
        stats
    }
}
