//! OperationQueue - the orchestrator.
//!
//! Owns the ordered live queue, the in-flight id set, the timer heap and the
//! processor registry. Routes due operations to processors and applies the
//! retry / backoff state machine to their outcomes.
//!
//! Locking: `state` is a `parking_lot::Mutex` and is never held across an
//! `.await`. Storage writes and processor calls happen outside the lock.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use super::driver::Driver;
use super::registry::ProcessorRegistry;
use super::stats::QueueStats;
use super::timers::{TimerKind, TimerQueue};
use super::QueueConfig;
use crate::domain::{
    EnqueueOptions, FailureKind, Operation, OperationId, OperationRecord, OperationState,
    OperationType, ProcessError, QueueError, QueueEvent, RecordPatch,
};
use crate::ports::{Clock, EventSink, IdGenerator, OperationProcessor, QueueStorage, UlidGenerator};

/// Result of one `process_queue` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Network is offline; nothing was selected.
    Offline,
    /// Another tick is in progress.
    Busy,
    /// The tick ran and dispatched this many operations.
    Ran { dispatched: usize },
}

/// What `initialize` found in storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Operations added to the live queue from storage.
    pub loaded: usize,
    /// Operations found mid-dispatch (PROCESSING) and reset to PENDING.
    pub recovered: usize,
}

struct QueueState {
    /// Sorted by `Operation::queue_order`.
    operations: Vec<Operation>,
    in_flight: HashSet<OperationId>,
    timers: TimerQueue,
}

impl QueueState {
    fn find_mut(&mut self, id: &OperationId) -> Option<&mut Operation> {
        self.operations.iter_mut().find(|op| op.id() == id)
    }

    fn insert_sorted(&mut self, op: Operation) {
        let pos = self
            .operations
            .partition_point(|existing| existing.queue_order(&op) != std::cmp::Ordering::Greater);
        self.operations.insert(pos, op);
    }
}

pub(crate) struct Inner {
    config: QueueConfig,
    storage: Arc<dyn QueueStorage>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    registry: RwLock<ProcessorRegistry>,
    state: Mutex<QueueState>,
    online: AtomicBool,
    initialized: AtomicBool,
    ticking: AtomicBool,
    /// Set by `start`, cleared by `stop`. The loop runs iff enabled && online.
    enabled: AtomicBool,
    wake: Arc<Notify>,
    driver: Mutex<Option<Driver>>,
}

/// Durable at-least-once operation queue.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct OperationQueue {
    pub(crate) inner: Arc<Inner>,
}

impl OperationQueue {
    /// Queue with ULID ids, no processors, online. Rejects an invalid config.
    pub fn new(
        config: QueueConfig,
        storage: Arc<dyn QueueStorage>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, QueueError> {
        config.validate()?;
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        Ok(Self::with_parts(
            config,
            storage,
            events,
            clock,
            ids,
            ProcessorRegistry::new(),
            true,
        ))
    }

    pub(crate) fn with_parts(
        config: QueueConfig,
        storage: Arc<dyn QueueStorage>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        registry: ProcessorRegistry,
        online: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                storage,
                events,
                clock,
                ids,
                registry: RwLock::new(registry),
                state: Mutex::new(QueueState {
                    operations: Vec::new(),
                    in_flight: HashSet::new(),
                    timers: TimerQueue::new(),
                }),
                online: AtomicBool::new(online),
                initialized: AtomicBool::new(false),
                ticking: AtomicBool::new(false),
                enabled: AtomicBool::new(false),
                wake: Arc::new(Notify::new()),
                driver: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------
    // lifecycle
    // ------------------------------------------------------------------

    /// Load persisted operations and rebuild the live queue.
    ///
    /// Runs once; later calls are no-ops. A failed load is logged and the
    /// queue starts empty.
    pub async fn initialize(&self) -> InitReport {
        if self.inner.initialized.swap(true, Ordering::AcqRel) {
            tracing::debug!("queue already initialized");
            return InitReport::default();
        }

        let records = if self.inner.config.persist_operations {
            match self.inner.storage.load_all().await {
                Ok(records) => records,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to load persisted operations; starting empty");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let now = self.now();
        let retention = self.inner.config.completed_retention();
        let mut report = InitReport::default();
        let mut recovered = Vec::new();
        {
            let mut state = self.inner.state.lock();
            for record in records {
                let mut op = record.into_operation();
                if state.operations.iter().any(|live| live.id() == op.id()) {
                    continue;
                }
                match op.state() {
                    // crashed mid-dispatch: deliver again
                    OperationState::Processing => {
                        op.set_state(OperationState::Pending, now);
                        recovered.push(op.clone());
                    }
                    OperationState::Completed => {
                        state.timers.schedule(
                            add(now, retention),
                            op.id().clone(),
                            TimerKind::PruneCompleted,
                        );
                    }
                    _ => {}
                }
                state.operations.push(op);
                report.loaded += 1;
            }
            state.operations.sort_by(Operation::queue_order);
        }
        report.recovered = recovered.len();

        for op in &recovered {
            self.persist_patch(op).await;
        }

        tracing::info!(
            loaded = report.loaded,
            recovered = report.recovered,
            "operation queue initialized"
        );

        if self.inner.config.auto_start {
            self.start();
        }
        report
    }

    /// Enable the periodic scheduling loop (spawned now if online).
    pub fn start(&self) {
        self.inner.enabled.store(true, Ordering::Release);
        if self.is_online() {
            self.spawn_driver();
        }
    }

    /// Disable the periodic scheduling loop. In-flight dispatches finish.
    pub fn stop(&self) {
        self.inner.enabled.store(false, Ordering::Release);
        self.stop_driver();
    }

    /// Stop the loop and wait for its current tick to finish.
    pub async fn shutdown(&self) {
        self.inner.enabled.store(false, Ordering::Release);
        let driver = self.inner.driver.lock().take();
        if let Some(driver) = driver {
            driver.shutdown_and_join().await;
        }
    }

    /// Is the periodic scheduling loop running?
    pub fn is_running(&self) -> bool {
        self.inner
            .driver
            .lock()
            .as_ref()
            .is_some_and(|driver| !driver.is_finished())
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::Acquire)
    }

    /// Network signal from the collaborator.
    ///
    /// Offline stops the loop (in-flight dispatches finish). Online restarts
    /// it if it was enabled; its first tick runs immediately.
    pub fn set_online(&self, online: bool) {
        let was = self.inner.online.swap(online, Ordering::AcqRel);
        if was == online {
            return;
        }
        let at = self.now();
        if online {
            tracing::info!("network back online");
            self.emit(QueueEvent::BackOnline { at });
            if self.inner.enabled.load(Ordering::Acquire) {
                self.spawn_driver();
            }
        } else {
            tracing::info!("network offline; scheduling paused");
            self.emit(QueueEvent::WentOffline { at });
            self.stop_driver();
        }
    }

    fn spawn_driver(&self) {
        let mut driver = self.inner.driver.lock();
        if driver.as_ref().is_some_and(|d| !d.is_finished()) {
            return;
        }
        *driver = Driver::spawn(Arc::downgrade(&self.inner), Arc::clone(&self.inner.wake));
    }

    fn stop_driver(&self) {
        let driver = self.inner.driver.lock().take();
        if let Some(driver) = driver {
            driver.request_shutdown();
        }
    }

    // ------------------------------------------------------------------
    // registry
    // ------------------------------------------------------------------

    /// Register a processor. Returns the types whose earlier processor was
    /// replaced (last registration wins).
    pub fn register_processor(&self, processor: Arc<dyn OperationProcessor>) -> Vec<OperationType> {
        self.inner.registry.write().register(processor)
    }

    pub fn registered_types(&self) -> Vec<OperationType> {
        self.inner.registry.read().registered_types()
    }

    // ------------------------------------------------------------------
    // queue API
    // ------------------------------------------------------------------

    /// Add an operation. Fails with `QueueError::Capacity` when full; never
    /// evicts.
    pub async fn enqueue(
        &self,
        op_type: impl Into<OperationType>,
        data: serde_json::Value,
        options: EnqueueOptions,
    ) -> Result<Operation, QueueError> {
        let op_type = op_type.into();
        let max = self.inner.config.max_queue_size;
        if self.inner.state.lock().operations.len() >= max {
            return Err(QueueError::Capacity { max });
        }

        let op = Operation::new(
            self.inner.ids.generate(&op_type),
            op_type,
            data,
            options.priority.unwrap_or(self.inner.config.default_priority),
            options
                .max_retries
                .unwrap_or(self.inner.config.default_max_retries),
            self.now(),
        );

        // Persist before the operation becomes visible to the scheduler.
        self.persist_save(&op).await;

        let admitted = {
            let mut state = self.inner.state.lock();
            if state.operations.len() >= max {
                false
            } else {
                state.insert_sorted(op.clone());
                true
            }
        };
        if !admitted {
            self.persist_remove(op.id()).await;
            return Err(QueueError::Capacity { max });
        }

        tracing::info!(
            operation_id = %op.id(),
            operation_type = %op.op_type(),
            priority = op.priority(),
            "operation enqueued"
        );
        self.emit(QueueEvent::Enqueued {
            id: op.id().clone(),
            op_type: op.op_type().clone(),
            priority: op.priority(),
            at: op.created_at(),
        });

        if self.is_online() && self.is_running() {
            self.inner.wake.notify_one();
        }
        Ok(op)
    }

    /// Cancel an operation. An in-flight dispatch is not aborted; its outcome
    /// is discarded.
    pub async fn remove(&self, id: &OperationId) -> bool {
        let removed = {
            let mut state = self.inner.state.lock();
            state.timers.cancel(id);
            state
                .operations
                .iter()
                .position(|op| op.id() == id)
                .map(|pos| state.operations.remove(pos))
        };
        self.persist_remove(id).await;

        match removed {
            Some(op) => {
                tracing::info!(operation_id = %id, state = %op.state(), "operation removed");
                self.emit(QueueEvent::Removed {
                    id: op.id().clone(),
                    op_type: op.op_type().clone(),
                    at: self.now(),
                });
                true
            }
            None => false,
        }
    }

    /// Empty the live queue and storage.
    pub async fn clear(&self) -> usize {
        let removed = {
            let mut state = self.inner.state.lock();
            state.timers.clear();
            let n = state.operations.len();
            state.operations.clear();
            n
        };
        if let Err(err) = self.inner.storage.clear().await {
            tracing::warn!(error = %err, "failed to clear storage");
        }
        tracing::info!(removed, "queue cleared");
        self.emit(QueueEvent::Cleared {
            removed,
            at: self.now(),
        });
        removed
    }

    /// Drop FAILED operations (kept for inspection until now).
    pub async fn clear_failed(&self) -> usize {
        let failed: Vec<OperationId> = {
            let mut state = self.inner.state.lock();
            let (failed, keep): (Vec<Operation>, Vec<Operation>) = std::mem::take(&mut state.operations)
                .into_iter()
                .partition(|op| op.state() == OperationState::Failed);
            state.operations = keep;
            failed.into_iter().map(|op| op.id().clone()).collect()
        };
        for id in &failed {
            self.persist_remove(id).await;
        }
        if !failed.is_empty() {
            tracing::info!(removed = failed.len(), "failed operations cleared");
        }
        failed.len()
    }

    pub fn get(&self, id: &OperationId) -> Option<Operation> {
        self.inner
            .state
            .lock()
            .operations
            .iter()
            .find(|op| op.id() == id)
            .cloned()
    }

    /// Snapshot of the live queue, in queue order.
    pub fn operations(&self) -> Vec<Operation> {
        self.inner.state.lock().operations.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().operations.is_empty()
    }

    pub fn get_stats(&self) -> QueueStats {
        let mut stats = {
            let state = self.inner.state.lock();
            let mut stats = QueueStats::collect(&state.operations);
            stats.in_flight = state.in_flight.len();
            stats
        };
        stats.online = self.is_online();
        stats.running = self.is_running();
        stats
    }

    /// Time until the earliest timer is due (zero if overdue).
    pub fn until_next_timer(&self) -> Option<Duration> {
        let due = self.inner.state.lock().timers.next_due()?;
        Some((due - self.now()).to_std().unwrap_or(Duration::ZERO))
    }

    // ------------------------------------------------------------------
    // scheduling
    // ------------------------------------------------------------------

    /// Apply every due timer: RETRYING -> PENDING wake-ups and pruning of
    /// COMPLETED operations. Returns how many timers took effect.
    pub async fn fire_due_timers(&self) -> usize {
        let now = self.now();
        let (woken, pruned) = {
            let mut state = self.inner.state.lock();
            let mut woken = Vec::new();
            let mut pruned = Vec::new();
            for timer in state.timers.pop_due(now) {
                match timer.kind {
                    TimerKind::RetryWake => {
                        if let Some(op) = state.find_mut(&timer.id) {
                            if op.state() == OperationState::Retrying {
                                op.set_state(OperationState::Pending, now);
                                woken.push(op.clone());
                            }
                        }
                    }
                    TimerKind::PruneCompleted => {
                        if let Some(pos) = state.operations.iter().position(|op| {
                            op.id() == &timer.id && op.state() == OperationState::Completed
                        }) {
                            state.operations.remove(pos);
                            pruned.push(timer.id);
                        }
                    }
                }
            }
            (woken, pruned)
        };

        for op in &woken {
            tracing::debug!(operation_id = %op.id(), "backoff elapsed; operation pending again");
            self.persist_patch(op).await;
        }
        for id in &pruned {
            tracing::debug!(operation_id = %id, "completed operation pruned");
            self.persist_remove(id).await;
        }
        woken.len() + pruned.len()
    }

    /// One scheduling tick.
    ///
    /// Selects up to `max_processing_attempts` due operations that are not
    /// already in flight, dispatches them concurrently and waits for all of
    /// them to settle. Only one tick runs at a time.
    pub async fn process_queue(&self) -> TickOutcome {
        if !self.is_online() {
            return TickOutcome::Offline;
        }
        if self
            .inner
            .ticking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("tick already in progress");
            return TickOutcome::Busy;
        }
        let _tick = TickGuard {
            flag: &self.inner.ticking,
        };

        self.fire_due_timers().await;

        let now = self.now();
        let selected: Vec<Operation> = {
            let mut state = self.inner.state.lock();
            let QueueState {
                operations,
                in_flight,
                timers,
            } = &mut *state;

            let mut selected = Vec::new();
            for op in operations.iter_mut() {
                if selected.len() >= self.inner.config.max_processing_attempts {
                    break;
                }
                if !op.state().is_schedulable() || in_flight.contains(op.id()) {
                    continue;
                }
                // still backing off
                if op.state() == OperationState::Retrying
                    && timers.is_armed(op.id(), TimerKind::RetryWake)
                {
                    continue;
                }
                op.set_state(OperationState::Processing, now);
                in_flight.insert(op.id().clone());
                selected.push(op.clone());
            }
            selected
        };

        let dispatched = selected.len();
        if dispatched > 0 {
            tracing::debug!(dispatched, "dispatching operations");
            join_all(selected.into_iter().map(|op| self.dispatch(op))).await;
        }
        TickOutcome::Ran { dispatched }
    }

    async fn dispatch(&self, op: Operation) {
        let _in_flight = InFlightGuard {
            inner: &self.inner,
            id: op.id().clone(),
        };

        self.persist_patch(&op).await;
        let attempt = op.retry_count() + 1;
        tracing::info!(
            operation_id = %op.id(),
            operation_type = %op.op_type(),
            attempt,
            "processing operation"
        );
        self.emit(QueueEvent::ProcessingStarted {
            id: op.id().clone(),
            op_type: op.op_type().clone(),
            attempt,
            at: self.now(),
        });

        let processor = self.inner.registry.read().resolve(op.op_type());
        let Some(processor) = processor else {
            let error = format!("no processor registered for type {}", op.op_type());
            self.fail_permanently(op.id(), None, error, FailureKind::NoProcessor)
                .await;
            return;
        };

        let result = AssertUnwindSafe(processor.process(&op))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ProcessError::retryable(format!(
                    "processor {} panicked: {}",
                    processor.name(),
                    panic_message(&*panic)
                )))
            });

        match result {
            Ok(value) => self.complete(op.id(), value).await,
            Err(err) => self.handle_failure(op.id(), processor, err).await,
        }
    }

    async fn complete(&self, id: &OperationId, result: Option<serde_json::Value>) {
        let now = self.now();
        let retention = self.inner.config.completed_retention();
        let done = {
            let mut state = self.inner.state.lock();
            match state.find_mut(id) {
                Some(op) => {
                    op.set_state(OperationState::Completed, now);
                    let op = op.clone();
                    state
                        .timers
                        .schedule(add(now, retention), id.clone(), TimerKind::PruneCompleted);
                    Some(op)
                }
                None => None,
            }
        };
        let Some(op) = done else {
            tracing::debug!(operation_id = %id, "operation removed while processing; success discarded");
            return;
        };

        self.persist_patch(&op).await;
        tracing::info!(operation_id = %id, operation_type = %op.op_type(), "operation completed");
        self.emit(QueueEvent::Completed {
            id: id.clone(),
            op_type: op.op_type().clone(),
            result,
            at: now,
        });
    }

    async fn handle_failure(
        &self,
        id: &OperationId,
        processor: Arc<dyn OperationProcessor>,
        err: ProcessError,
    ) {
        let now = self.now();
        let scheduled = {
            let mut state = self.inner.state.lock();
            let Some(op) = state.find_mut(id) else {
                tracing::debug!(operation_id = %id, error = %err, "operation removed while processing; failure discarded");
                return;
            };
            if err.is_retryable() && op.can_retry() {
                let delay = op.retry_delay(&self.inner.config.retry);
                op.increment_retry_count(now);
                op.set_state(OperationState::Retrying, now);
                let op = op.clone();
                state
                    .timers
                    .schedule(add(now, delay), id.clone(), TimerKind::RetryWake);
                Some((op, delay))
            } else {
                // saturates at max_retries, so an exhausted budget stays put
                op.increment_retry_count(now);
                None
            }
        };

        match scheduled {
            Some((op, delay)) => {
                self.persist_patch(&op).await;
                tracing::warn!(
                    operation_id = %id,
                    operation_type = %op.op_type(),
                    retry_count = op.retry_count(),
                    max_retries = op.max_retries(),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "operation failed; retry scheduled"
                );
                self.emit(QueueEvent::RetryScheduled {
                    id: id.clone(),
                    op_type: op.op_type().clone(),
                    delay,
                    retry_count: op.retry_count(),
                    error: err.message().to_string(),
                    at: now,
                });
                // let a sleeping loop pick up the new deadline
                if self.is_running() {
                    self.inner.wake.notify_one();
                }
            }
            None => {
                let kind = if err.is_retryable() {
                    FailureKind::RetriesExhausted
                } else {
                    FailureKind::Permanent
                };
                self.fail_permanently(id, Some(processor), err.message().to_string(), kind)
                    .await;
            }
        }
    }

    /// Mark FAILED, persist, compensate (best effort), notify.
    async fn fail_permanently(
        &self,
        id: &OperationId,
        processor: Option<Arc<dyn OperationProcessor>>,
        error: String,
        kind: FailureKind,
    ) {
        let now = self.now();
        let failed = {
            let mut state = self.inner.state.lock();
            state.find_mut(id).map(|op| {
                op.set_state(OperationState::Failed, now);
                op.clone()
            })
        };
        let Some(op) = failed else {
            tracing::debug!(operation_id = %id, "operation removed while processing; failure discarded");
            return;
        };

        self.persist_patch(&op).await;
        tracing::error!(
            operation_id = %id,
            operation_type = %op.op_type(),
            retry_count = op.retry_count(),
            kind = ?kind,
            error = %error,
            "operation failed permanently"
        );

        if let Some(processor) = processor {
            match AssertUnwindSafe(processor.compensate(&op)).catch_unwind().await {
                Ok(Ok(())) => {
                    tracing::debug!(operation_id = %id, processor = processor.name(), "compensation ran");
                }
                Ok(Err(err)) => {
                    tracing::error!(operation_id = %id, processor = processor.name(), error = %err, "compensation failed");
                }
                Err(panic) => {
                    tracing::error!(
                        operation_id = %id,
                        processor = processor.name(),
                        panic = %panic_message(&*panic),
                        "compensation panicked"
                    );
                }
            }
        }

        self.emit(QueueEvent::Failed {
            id: id.clone(),
            op_type: op.op_type().clone(),
            error,
            kind,
            at: now,
        });
    }

    // ------------------------------------------------------------------
    // helpers
    // ------------------------------------------------------------------

    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.inner.clock.now()
    }

    fn emit(&self, event: QueueEvent) {
        self.inner.events.emit(event);
    }

    async fn persist_save(&self, op: &Operation) {
        if !self.inner.config.persist_operations {
            return;
        }
        if let Err(err) = self.inner.storage.save(&OperationRecord::from(op)).await {
            tracing::warn!(operation_id = %op.id(), error = %err, "failed to persist operation");
        }
    }

    async fn persist_patch(&self, op: &Operation) {
        if !self.inner.config.persist_operations {
            return;
        }
        let patch = RecordPatch::from_operation(op);
        if let Err(err) = self.inner.storage.update(op.id(), &patch).await {
            tracing::warn!(operation_id = %op.id(), state = %op.state(), error = %err, "failed to persist state change");
        }
    }

    async fn persist_remove(&self, id: &OperationId) {
        if !self.inner.config.persist_operations {
            return;
        }
        if let Err(err) = self.inner.storage.remove(id).await {
            tracing::warn!(operation_id = %id, error = %err, "failed to remove persisted operation");
        }
    }
}

impl std::fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationQueue")
            .field("len", &self.len())
            .field("online", &self.is_online())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Clears the re-entrancy flag when the tick ends, however it ends.
struct TickGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Removes the id from the in-flight set when the dispatch settles.
struct InFlightGuard<'a> {
    inner: &'a Inner,
    id: OperationId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.inner.state.lock().in_flight.remove(&self.id);
    }
}

fn add(at: chrono::DateTime<chrono::Utc>, d: Duration) -> chrono::DateTime<chrono::Utc> {
    chrono::Duration::from_std(d)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(at)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
