//! InMemoryStorage - テスト用・永続化無効時のストレージ
//!
//! レコードは JSON 値として保持します。本番のバックエンドと同じく
//! スキーマを経由させることで、シリアライズ不整合をテストで検出できます。

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{OperationId, OperationRecord, RecordPatch, StorageError};
use crate::ports::QueueStorage;

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    records: Mutex<HashMap<OperationId, serde_json::Value>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Decoded copy of one record (for assertions).
    pub fn get(&self, id: &OperationId) -> Option<OperationRecord> {
        let value = self.records.lock().get(id).cloned()?;
        OperationRecord::decode(value).ok()
    }
}

#[async_trait]
impl QueueStorage for InMemoryStorage {
    async fn save(&self, record: &OperationRecord) -> Result<(), StorageError> {
        let value = record.encode()?;
        self.records.lock().insert(record.id.clone(), value);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<OperationRecord>, StorageError> {
        let values: Vec<(OperationId, serde_json::Value)> = self
            .records
            .lock()
            .iter()
            .map(|(id, v)| (id.clone(), v.clone()))
            .collect();
        Ok(super::decode_records(values))
    }

    async fn update(&self, id: &OperationId, patch: &RecordPatch) -> Result<(), StorageError> {
        let mut records = self.records.lock();
        let Some(value) = records.get_mut(id) else {
            return Ok(());
        };
        let mut record = OperationRecord::decode(value.clone())?;
        record.apply(patch);
        *value = record.encode()?;
        Ok(())
    }

    async fn remove(&self, id: &OperationId) -> Result<(), StorageError> {
        self.records.lock().remove(id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.records.lock().clear();
        Ok(())
    }
}
