//! Typed - 型付き Operation API
//!
//! operation type の typo を型で排除し、payload のデコードを processor
//! から取り除きます。
//!
//! # 二層構造
//! - **表層（Typed）**: `TypedOperation` trait, `TypedProcessor<T>` trait - 型安全
//! - **内部（Dyn）**: `OperationProcessor` trait - object-safe, `Typed<T, P>` で変換

pub mod operation;
pub mod processor;

pub use self::operation::TypedOperation;
pub use self::processor::{Typed, TypedProcessor};

use std::sync::Arc;

use crate::domain::{EnqueueOptions, Operation, OperationType, QueueError};
use crate::queue::OperationQueue;

impl OperationQueue {
    /// Enqueue a typed payload under `T::TYPE`.
    pub async fn enqueue_typed<T: TypedOperation>(
        &self,
        payload: &T,
        options: EnqueueOptions,
    ) -> Result<Operation, QueueError> {
        let data = serde_json::to_value(payload)?;
        self.enqueue(T::TYPE, data, options).await
    }

    /// Register a typed processor for `T::TYPE`.
    pub fn register_typed<T, P>(&self, processor: P) -> Vec<OperationType>
    where
        T: TypedOperation,
        P: TypedProcessor<T> + 'static,
    {
        self.register_processor(Arc::new(Typed::<T, P>::new(processor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailureKind, OperationState, ProcessResult, QueueEvent};
    use crate::impls::{BroadcastEventSink, InMemoryStorage};
    use crate::ports::ManualClock;
    use crate::queue::QueueConfig;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct LessonProgress {
        lesson_id: String,
        percent: u8,
    }

    impl TypedOperation for LessonProgress {
        const TYPE: &'static str = "lesson.progress";
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<LessonProgress>>,
    }

    #[async_trait]
    impl TypedProcessor<LessonProgress> for Arc<Recorder> {
        async fn process(&self, payload: LessonProgress, _operation: &Operation) -> ProcessResult {
            let percent = payload.percent;
            self.seen.lock().push(payload);
            Ok(Some(json!({ "stored": percent })))
        }
    }

    fn queue() -> (OperationQueue, Arc<BroadcastEventSink>) {
        let events = Arc::new(BroadcastEventSink::new(64));
        let queue = OperationQueue::new(
            QueueConfig {
                auto_start: false,
                ..QueueConfig::default()
            },
            Arc::new(InMemoryStorage::new()),
            events.clone(),
            Arc::new(ManualClock::default()),
        )
        .unwrap();
        (queue, events)
    }

    #[tokio::test]
    async fn typed_round_trip_through_the_queue() {
        let (queue, _events) = queue();
        let recorder = Arc::new(Recorder::default());
        queue.register_typed::<LessonProgress, _>(Arc::clone(&recorder));

        let payload = LessonProgress {
            lesson_id: "rust-101".into(),
            percent: 40,
        };
        let op = queue
            .enqueue_typed(&payload, EnqueueOptions::new())
            .await
            .unwrap();
        assert_eq!(op.op_type().as_str(), "lesson.progress");
        assert!(op.id().as_str().starts_with("lesson.progress-"));

        queue.process_queue().await;
        assert_eq!(queue.get(op.id()).unwrap().state(), OperationState::Completed);
        assert_eq!(*recorder.seen.lock(), vec![payload]);
    }

    #[tokio::test]
    async fn malformed_payload_fails_permanently() {
        let (queue, events) = queue();
        let mut rx = events.subscribe();
        queue.register_typed::<LessonProgress, _>(Arc::new(Recorder::default()));

        let op = queue
            .enqueue(
                LessonProgress::TYPE,
                json!({ "lesson_id": 7 }),
                EnqueueOptions::new().max_retries(5),
            )
            .await
            .unwrap();
        queue.process_queue().await;

        let failed = queue.get(op.id()).unwrap();
        assert_eq!(failed.state(), OperationState::Failed);
        assert_eq!(failed.retry_count(), 1);

        let failure = std::iter::from_fn(|| rx.try_recv().ok()).find_map(|e| match e {
            QueueEvent::Failed { kind, .. } => Some(kind),
            _ => None,
        });
        assert_eq!(failure, Some(FailureKind::Permanent));
    }
}
