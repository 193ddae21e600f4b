#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use courier_core::impls::BroadcastEventSink;
use courier_core::ports::{ManualClock, QueueStorage};
use courier_core::{
    Operation, OperationId, OperationProcessor, OperationQueue, OperationType, ProcessError,
    ProcessResult, QueueBuilder, QueueConfig, QueueEvent,
};
use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};

/// Manual scheduling: no background loop, tests call `process_queue()`.
pub fn manual_config() -> QueueConfig {
    QueueConfig {
        auto_start: false,
        ..QueueConfig::default()
    }
}

pub struct Harness {
    pub queue: OperationQueue,
    pub clock: Arc<ManualClock>,
    pub events: broadcast::Receiver<QueueEvent>,
}

pub fn harness(config: QueueConfig, storage: Arc<dyn QueueStorage>) -> Harness {
    let clock = Arc::new(ManualClock::default());
    let sink = Arc::new(BroadcastEventSink::new(1024));
    let events = sink.subscribe();
    let queue = QueueBuilder::new()
        .config(config)
        .storage(storage)
        .events(sink)
        .clock(clock.clone())
        .build()
        .unwrap();
    Harness {
        queue,
        clock,
        events,
    }
}

pub fn drain(rx: &mut broadcast::Receiver<QueueEvent>) -> Vec<QueueEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

/// Returns scripted results in order, then succeeds.
pub struct Scripted {
    op_type: &'static str,
    script: Mutex<VecDeque<ProcessResult>>,
    pub calls: Mutex<Vec<OperationId>>,
    pub compensations: AtomicUsize,
}

impl Scripted {
    pub fn new(op_type: &'static str, script: Vec<ProcessResult>) -> Arc<Self> {
        Arc::new(Self {
            op_type,
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            compensations: AtomicUsize::new(0),
        })
    }

    pub fn always_ok(op_type: &'static str) -> Arc<Self> {
        Self::new(op_type, Vec::new())
    }

    pub fn calls(&self) -> Vec<OperationId> {
        self.calls.lock().clone()
    }

    pub fn compensations(&self) -> usize {
        self.compensations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperationProcessor for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn supported_types(&self) -> Vec<OperationType> {
        vec![OperationType::new(self.op_type)]
    }

    async fn process(&self, operation: &Operation) -> ProcessResult {
        self.calls.lock().push(operation.id().clone());
        self.script.lock().pop_front().unwrap_or(Ok(None))
    }

    async fn compensate(&self, _operation: &Operation) -> Result<(), ProcessError> {
        self.compensations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Blocks inside `process` until released.
pub struct Gated {
    op_type: &'static str,
    pub entered: Notify,
    pub release: Notify,
    pub result: Mutex<ProcessResult>,
}

impl Gated {
    pub fn new(op_type: &'static str) -> Arc<Self> {
        Arc::new(Self {
            op_type,
            entered: Notify::new(),
            release: Notify::new(),
            result: Mutex::new(Ok(None)),
        })
    }
}

#[async_trait]
impl OperationProcessor for Gated {
    fn name(&self) -> &str {
        "gated"
    }

    fn supported_types(&self) -> Vec<OperationType> {
        vec![OperationType::new(self.op_type)]
    }

    async fn process(&self, _operation: &Operation) -> ProcessResult {
        self.entered.notify_one();
        self.release.notified().await;
        self.result.lock().clone()
    }
}
