mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Gated, Scripted, drain, harness, manual_config};
use courier_core::impls::InMemoryStorage;
use courier_core::{
    EnqueueOptions, FailureKind, OperationState, ProcessError, QueueConfig, QueueEvent,
    RetryPolicy, TickOutcome,
};
use serde_json::json;

#[tokio::test]
async fn higher_priority_is_dispatched_first() {
    let config = QueueConfig {
        max_processing_attempts: 1,
        ..manual_config()
    };
    let h = harness(config, Arc::new(InMemoryStorage::new()));
    let sync = Scripted::always_ok("lesson.progress");
    h.queue.register_processor(sync.clone());

    let low = h
        .queue
        .enqueue("lesson.progress", json!({"lesson": 1}), EnqueueOptions::new().priority(5))
        .await
        .unwrap();
    h.clock.advance(Duration::from_millis(10));
    let high = h
        .queue
        .enqueue("lesson.progress", json!({"lesson": 2}), EnqueueOptions::new().priority(10))
        .await
        .unwrap();

    assert_eq!(h.queue.process_queue().await, TickOutcome::Ran { dispatched: 1 });
    assert_eq!(sync.calls(), vec![high.id().clone()]);

    h.queue.process_queue().await;
    assert_eq!(sync.calls(), vec![high.id().clone(), low.id().clone()]);
}

#[tokio::test]
async fn queue_stays_sorted_by_priority_then_age() {
    let h = harness(manual_config(), Arc::new(InMemoryStorage::new()));

    for priority in [3, -1, 7, 3, 0, 7, 12, -1, 3] {
        h.queue
            .enqueue("profile.update", json!({}), EnqueueOptions::new().priority(priority))
            .await
            .unwrap();
        h.clock.advance(Duration::from_millis(1));

        let ops = h.queue.operations();
        for pair in ops.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.priority() > b.priority()
                    || (a.priority() == b.priority() && a.created_at() <= b.created_at()),
                "out of order: {:?} before {:?}",
                (a.priority(), a.created_at()),
                (b.priority(), b.created_at())
            );
        }
    }
}

#[tokio::test]
async fn retries_exhaust_after_max_retries_and_compensate_once() {
    let h = harness(manual_config(), Arc::new(InMemoryStorage::new()));
    let mut events = h.events;
    let flaky = Scripted::new(
        "lesson.progress",
        vec![
            Err(ProcessError::retryable("timeout")),
            Err(ProcessError::retryable("timeout")),
            Err(ProcessError::retryable("timeout")),
        ],
    );
    h.queue.register_processor(flaky.clone());

    let op = h
        .queue
        .enqueue("lesson.progress", json!({}), EnqueueOptions::new().max_retries(2))
        .await
        .unwrap();

    // attempt 1
    h.queue.process_queue().await;
    let current = h.queue.get(op.id()).unwrap();
    assert_eq!(current.state(), OperationState::Retrying);
    assert_eq!(current.retry_count(), 1);

    // still backing off
    assert_eq!(h.queue.process_queue().await, TickOutcome::Ran { dispatched: 0 });

    // attempt 2
    h.clock.advance(Duration::from_secs(1));
    h.queue.process_queue().await;
    assert_eq!(h.queue.get(op.id()).unwrap().retry_count(), 2);

    // attempt 3
    h.clock.advance(Duration::from_secs(2));
    h.queue.process_queue().await;
    let failed = h.queue.get(op.id()).unwrap();
    assert_eq!(failed.state(), OperationState::Failed);
    assert_eq!(failed.retry_count(), 2);

    assert_eq!(flaky.calls().len(), 3);
    assert_eq!(flaky.compensations(), 1);

    // terminal: nothing more happens
    h.clock.advance(Duration::from_secs(60));
    h.queue.process_queue().await;
    assert_eq!(flaky.calls().len(), 3);
    assert_eq!(flaky.compensations(), 1);

    let events = drain(&mut events);
    let retries: Vec<(Duration, u32)> = events
        .iter()
        .filter_map(|e| match e {
            QueueEvent::RetryScheduled {
                delay, retry_count, ..
            } => Some((*delay, *retry_count)),
            _ => None,
        })
        .collect();
    assert_eq!(
        retries,
        vec![(Duration::from_secs(1), 1), (Duration::from_secs(2), 2)]
    );
    let failures: Vec<FailureKind> = events
        .iter()
        .filter_map(|e| match e {
            QueueEvent::Failed { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![FailureKind::RetriesExhausted]);
}

#[tokio::test]
async fn backoff_is_capped_by_the_ceiling() {
    let config = QueueConfig {
        retry: RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(4)),
        ..manual_config()
    };
    let h = harness(config, Arc::new(InMemoryStorage::new()));
    let mut events = h.events;
    let failing = Scripted::new(
        "profile.update",
        (0..6).map(|_| Err(ProcessError::retryable("503"))).collect(),
    );
    h.queue.register_processor(failing.clone());
    h.queue
        .enqueue("profile.update", json!({}), EnqueueOptions::new().max_retries(5))
        .await
        .unwrap();

    for _ in 0..6 {
        h.queue.process_queue().await;
        h.clock.advance(Duration::from_secs(4));
    }

    let delays: Vec<u64> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            QueueEvent::RetryScheduled { delay, .. } => Some(delay.as_secs()),
            _ => None,
        })
        .collect();
    assert_eq!(delays, vec![1, 2, 4, 4, 4]);
    assert_eq!(failing.calls().len(), 6);
    assert_eq!(failing.compensations(), 1);
}

#[tokio::test]
async fn permanent_error_skips_the_retry_budget() {
    let h = harness(manual_config(), Arc::new(InMemoryStorage::new()));
    let rejecting = Scripted::new(
        "profile.update",
        vec![Err(ProcessError::permanent("400 bad request"))],
    );
    h.queue.register_processor(rejecting.clone());

    let op = h
        .queue
        .enqueue("profile.update", json!({"name": ""}), EnqueueOptions::new().max_retries(5))
        .await
        .unwrap();
    h.queue.process_queue().await;

    let failed = h.queue.get(op.id()).unwrap();
    assert_eq!(failed.state(), OperationState::Failed);
    assert_eq!(failed.retry_count(), 1);
    assert_eq!(rejecting.calls().len(), 1);
    assert_eq!(rejecting.compensations(), 1);
}

#[tokio::test]
async fn permanent_error_with_no_retry_budget_keeps_the_count_at_zero() {
    let h = harness(manual_config(), Arc::new(InMemoryStorage::new()));
    let rejecting = Scripted::new(
        "profile.update",
        vec![Err(ProcessError::permanent("409 conflict"))],
    );
    h.queue.register_processor(rejecting.clone());

    let op = h
        .queue
        .enqueue("profile.update", json!({}), EnqueueOptions::new().max_retries(0))
        .await
        .unwrap();
    h.queue.process_queue().await;

    let failed = h.queue.get(op.id()).unwrap();
    assert_eq!(failed.state(), OperationState::Failed);
    assert_eq!(failed.retry_count(), 0);
}

#[tokio::test]
async fn dispatch_is_capped_per_tick() {
    let h = harness(manual_config(), Arc::new(InMemoryStorage::new()));
    let sync = Scripted::always_ok("lesson.progress");
    h.queue.register_processor(sync.clone());
    for _ in 0..5 {
        h.queue
            .enqueue("lesson.progress", json!({}), EnqueueOptions::new())
            .await
            .unwrap();
    }

    assert_eq!(h.queue.process_queue().await, TickOutcome::Ran { dispatched: 3 });
    assert_eq!(h.queue.process_queue().await, TickOutcome::Ran { dispatched: 2 });
    assert_eq!(h.queue.get_stats().by_state.completed, 5);
}

#[tokio::test]
async fn overlapping_tick_is_refused() {
    let h = harness(manual_config(), Arc::new(InMemoryStorage::new()));
    let gate = Gated::new("lesson.progress");
    h.queue.register_processor(gate.clone());
    h.queue
        .enqueue("lesson.progress", json!({}), EnqueueOptions::new())
        .await
        .unwrap();

    let queue = h.queue.clone();
    let tick = tokio::spawn(async move { queue.process_queue().await });
    gate.entered.notified().await;

    assert_eq!(h.queue.process_queue().await, TickOutcome::Busy);
    assert_eq!(h.queue.get_stats().in_flight, 1);

    gate.release.notify_one();
    assert_eq!(tick.await.unwrap(), TickOutcome::Ran { dispatched: 1 });
    assert_eq!(h.queue.get_stats().in_flight, 0);
}

#[tokio::test]
async fn going_offline_mid_tick_lets_in_flight_work_finish() {
    let h = harness(manual_config(), Arc::new(InMemoryStorage::new()));
    let mut events = h.events;
    let gate = Gated::new("lesson.progress");
    h.queue.register_processor(gate.clone());

    let first = h
        .queue
        .enqueue("lesson.progress", json!({}), EnqueueOptions::new())
        .await
        .unwrap();
    let queue = h.queue.clone();
    let tick = tokio::spawn(async move { queue.process_queue().await });
    gate.entered.notified().await;

    h.queue.set_online(false);
    let second = h
        .queue
        .enqueue("lesson.progress", json!({}), EnqueueOptions::new())
        .await
        .unwrap();
    assert_eq!(h.queue.process_queue().await, TickOutcome::Offline);

    gate.release.notify_one();
    assert_eq!(tick.await.unwrap(), TickOutcome::Ran { dispatched: 1 });
    assert_eq!(h.queue.get(first.id()).unwrap().state(), OperationState::Completed);
    assert_eq!(h.queue.get(second.id()).unwrap().state(), OperationState::Pending);

    h.queue.set_online(true);
    gate.release.notify_one();
    assert_eq!(h.queue.process_queue().await, TickOutcome::Ran { dispatched: 1 });
    assert_eq!(h.queue.get(second.id()).unwrap().state(), OperationState::Completed);

    let names: Vec<&str> = drain(&mut events)
        .iter()
        .map(|e| e.name())
        .filter(|n| *n == "went_offline" || *n == "back_online")
        .collect();
    assert_eq!(names, vec!["went_offline", "back_online"]);
}

#[tokio::test]
async fn removing_a_processing_operation_discards_its_outcome() {
    let storage = Arc::new(InMemoryStorage::new());
    let h = harness(manual_config(), storage.clone());
    let mut events = h.events;
    let gate = Gated::new("lesson.progress");
    *gate.result.lock() = Err(ProcessError::retryable("late failure"));
    h.queue.register_processor(gate.clone());

    let op = h
        .queue
        .enqueue("lesson.progress", json!({}), EnqueueOptions::new())
        .await
        .unwrap();
    let queue = h.queue.clone();
    let tick = tokio::spawn(async move { queue.process_queue().await });
    gate.entered.notified().await;

    assert!(h.queue.remove(op.id()).await);
    gate.release.notify_one();
    assert_eq!(tick.await.unwrap(), TickOutcome::Ran { dispatched: 1 });

    assert!(h.queue.get(op.id()).is_none());
    assert!(storage.get(op.id()).is_none());
    assert_eq!(h.queue.get_stats().in_flight, 0);

    let after_removal: Vec<&str> = drain(&mut events)
        .iter()
        .map(|e| e.name())
        .skip_while(|n| *n != "removed")
        .collect();
    assert_eq!(after_removal, vec!["removed"]);
}

#[tokio::test]
async fn enqueue_beyond_capacity_never_evicts() {
    let config = QueueConfig {
        max_queue_size: 3,
        ..manual_config()
    };
    let h = harness(config, Arc::new(InMemoryStorage::new()));
    let mut ids = Vec::new();
    for p in 0..3 {
        let op = h
            .queue
            .enqueue("lesson.progress", json!({}), EnqueueOptions::new().priority(p))
            .await
            .unwrap();
        ids.push(op.id().clone());
    }

    for _ in 0..3 {
        let err = h
            .queue
            .enqueue("lesson.progress", json!({}), EnqueueOptions::new().priority(99))
            .await
            .unwrap_err();
        assert!(matches!(err, courier_core::QueueError::Capacity { max: 3 }));
    }
    for id in &ids {
        assert!(h.queue.get(id).is_some());
    }
    assert_eq!(h.queue.len(), 3);
}
