//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! orchestrator はここにある trait だけに依存し、ストレージ・時刻・ID 採番・
//! イベント配信・processor の実装はコンストラクタで注入されます。

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod processor;
pub mod storage;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::processor::OperationProcessor;
pub use self::storage::QueueStorage;
