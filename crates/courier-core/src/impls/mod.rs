//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStorage**: テスト用・永続化無効時
//! - **JsonFileStorage**: ローカルファイルの key-value ストレージ
//! - **NoopEventSink / BroadcastEventSink / TracingEventSink**

pub mod event_sinks;
pub mod file_storage;
pub mod memory_storage;

pub use self::event_sinks::{BroadcastEventSink, NoopEventSink, TracingEventSink};
pub use self::file_storage::JsonFileStorage;
pub use self::memory_storage::InMemoryStorage;

use crate::domain::{OperationId, OperationRecord};

/// Decode stored values, skipping (and logging) the ones that do not parse.
pub(crate) fn decode_records(
    values: impl IntoIterator<Item = (OperationId, serde_json::Value)>,
) -> Vec<OperationRecord> {
    values
        .into_iter()
        .filter_map(|(id, value)| match OperationRecord::decode(value) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(operation_id = %id, error = %err, "skipping undecodable record");
                None
            }
        })
        .collect()
}
