//! Domain identifiers.
//!
//! `OperationId` は enqueue 時に一度だけ採番され、以後変わりません。
//! 形式は `{operation_type}-{ULID}` で、ULID の先頭 48bit が採番時刻、
//! 残り 80bit がランダム部分です。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Routing tag of an operation (e.g. `lesson.progress.sync`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationType(String);

impl OperationType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for OperationType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for OperationType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Stable identity of one operation.
///
/// Built from the operation type plus a ULID, so ids of the same type sort by
/// creation time and never collide across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Wrap an existing id (e.g. one read back from storage).
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Derive an id from the type, a millisecond timestamp and random bits.
    pub fn from_parts(op_type: &OperationType, timestamp_ms: u64, random: u128) -> Self {
        Self::from_ulid(op_type, Ulid::from_parts(timestamp_ms, random))
    }

    pub fn from_ulid(op_type: &OperationType, ulid: Ulid) -> Self {
        Self(format!("{}-{}", op_type, ulid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ULID suffix, if this id was generated by `from_parts`.
    pub fn ulid(&self) -> Option<Ulid> {
        let (_, suffix) = self.0.rsplit_once('-')?;
        Ulid::from_string(suffix).ok()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
