//! Persisted record: the storage-boundary form of an `Operation`.
//!
//! The schema is versioned. Any storage backend must round-trip it exactly.
//! Bump `SCHEMA_VERSION` and add a migration step in `OperationRecord::decode`
//! when the shape changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::StorageError;
use super::ids::{OperationId, OperationType};
use super::operation::Operation;
use super::state::OperationState;

/// Current version of the persisted record schema.
pub const SCHEMA_VERSION: u32 = 1;

fn v1() -> u32 {
    1
}

fn empty_data() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Serialized form of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    /// Records written before versioning existed read as v1.
    #[serde(default = "v1")]
    pub schema_version: u32,
    pub id: OperationId,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    #[serde(default = "empty_data")]
    pub data: serde_json::Value,
    pub priority: i32,
    pub max_retries: u32,
    pub retry_count: u32,
    pub state: OperationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OperationRecord {
    /// Decode a record from its JSON form, checking the schema version.
    pub fn decode(value: serde_json::Value) -> Result<Self, StorageError> {
        let record: OperationRecord = serde_json::from_value(value)?;
        match record.schema_version {
            SCHEMA_VERSION => Ok(record),
            found => Err(StorageError::UnsupportedSchema {
                found,
                supported: SCHEMA_VERSION,
            }),
        }
    }

    pub fn encode(&self) -> Result<serde_json::Value, StorageError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(retry_count) = patch.retry_count {
            self.retry_count = retry_count;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }

    pub fn into_operation(self) -> Operation {
        Operation::restore(
            self.id,
            self.op_type,
            self.data,
            self.priority,
            self.max_retries,
            self.retry_count,
            self.state,
            self.created_at,
            self.updated_at,
        )
    }
}

impl From<&Operation> for OperationRecord {
    fn from(op: &Operation) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id: op.id().clone(),
            op_type: op.op_type().clone(),
            data: op.data().clone(),
            priority: op.priority(),
            max_retries: op.max_retries(),
            retry_count: op.retry_count(),
            state: op.state(),
            created_at: op.created_at(),
            updated_at: op.updated_at(),
        }
    }
}

/// Partial update of the mutable fields of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<OperationState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecordPatch {
    /// Snapshot of every mutable field of `op`.
    pub fn from_operation(op: &Operation) -> Self {
        Self {
            state: Some(op.state()),
            retry_count: Some(op.retry_count()),
            updated_at: Some(op.updated_at()),
        }
    }
}
