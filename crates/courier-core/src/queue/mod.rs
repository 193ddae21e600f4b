//! Queue - 永続キューのオーケストレーション
//!
//! - **config**: `QueueConfig`（JSON から読める設定）
//! - **retry**: 指数バックオフ
//! - **registry**: operation type → processor
//! - **timers**: retry wake-up / completed pruning の min-heap
//! - **orchestrator**: `OperationQueue` 本体
//! - **driver**: 定期 tick ループ

mod config;
mod driver;
mod orchestrator;
mod registry;
mod retry;
mod stats;
mod timers;

pub use self::config::QueueConfig;
pub use self::orchestrator::{InitReport, OperationQueue, TickOutcome};
pub use self::registry::ProcessorRegistry;
pub use self::retry::RetryPolicy;
pub use self::stats::{QueueStats, StateCounts};
