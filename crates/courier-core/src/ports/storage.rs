//! QueueStorage port - 永続化の正本（source of truth）
//!
//! メモリ上のキューは起動時にここから再構築されるキャッシュです。
//!
//! # 実装
//! - `InMemoryStorage`（テスト・永続化無効時）
//! - `JsonFileStorage`（ローカルの key-value JSON ファイル）

use async_trait::async_trait;

use crate::domain::{OperationId, OperationRecord, RecordPatch, StorageError};

/// Persistence port for operation records.
///
/// # 設計原則
/// - `save` は同じ id を上書きする（append/overwrite-safe）
/// - 存在しない id への `update` / `remove` はエラーではなく no-op
///   （並行する remove との競合に備える）
/// - `load_all` の順序は保証しない。並び順は orchestrator が再計算する
#[async_trait]
pub trait QueueStorage: Send + Sync {
    async fn save(&self, record: &OperationRecord) -> Result<(), StorageError>;

    async fn load_all(&self) -> Result<Vec<OperationRecord>, StorageError>;

    async fn update(&self, id: &OperationId, patch: &RecordPatch) -> Result<(), StorageError>;

    async fn remove(&self, id: &OperationId) -> Result<(), StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;
}
