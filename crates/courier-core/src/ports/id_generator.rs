//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: `{operation_type}-{ULID}`（本番用）

use std::sync::Arc;

use parking_lot::Mutex;
use ulid::Ulid;

use crate::domain::{OperationId, OperationType};
use crate::ports::Clock;

/// IdGenerator は operation の ID を採番
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから enqueue できる）
pub trait IdGenerator: Send + Sync {
    fn generate(&self, op_type: &OperationType) -> OperationId;
}

/// ULID-based ids: clock timestamp + random suffix.
///
/// Clock を共有するので、テストで ManualClock を使えば timestamp 部分は
/// 決定的になります（ランダム部分は異なる）。
///
/// 同じミリ秒内（または clock が戻った場合）は直前の ULID を +1 するので、
/// 採番順と ULID 順が常に一致します。
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
    last: Mutex<Option<Ulid>>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last: Mutex::new(None),
        }
    }
}

impl IdGenerator for UlidGenerator {
    fn generate(&self, op_type: &OperationType) -> OperationId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let mut last = self.last.lock();
        let ulid = match *last {
            Some(prev) if prev.timestamp_ms() >= timestamp_ms => prev
                .increment()
                .unwrap_or_else(|| Ulid::from_parts(timestamp_ms, rand::random())),
            _ => Ulid::from_parts(timestamp_ms, rand::random()),
        };
        *last = Some(ulid);
        OperationId::from_ulid(op_type, ulid)
    }
}
