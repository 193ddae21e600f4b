//! courier-core
//!
//! Durable, at-least-once operation queue for clients that are often offline.
//! Operations are persisted on enqueue, dispatched to type-specific processors
//! while the network is up, retried with capped exponential backoff, and
//! compensated when they are abandoned.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, operation, record, outcome, events, errors）
//! - **ports**: 抽象化レイヤー（QueueStorage, OperationProcessor, EventSink, Clock, IdGenerator）
//! - **impls**: ports の実装（InMemoryStorage, JsonFileStorage, event sinks）
//! - **queue**: オーケストレーション（OperationQueue, config, retry, registry, timers, driver）
//! - **typed**: 型付き Operation API（TypedOperation, TypedProcessor）
//! - **builder**: QueueBuilder（依存注入と起動時検証）

pub mod builder;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod typed;

pub use builder::{BuildError, QueueBuilder};
pub use domain::{
    EnqueueOptions, FailureKind, Operation, OperationId, OperationState, OperationType,
    ProcessError, ProcessResult, QueueError, QueueEvent, StorageError,
};
pub use ports::OperationProcessor;
pub use queue::{OperationQueue, QueueConfig, QueueStats, RetryPolicy, TickOutcome};
pub use typed::{TypedOperation, TypedProcessor};
