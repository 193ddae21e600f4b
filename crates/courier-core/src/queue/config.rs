//! Queue configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RetryPolicy;
use crate::domain::QueueError;

/// Recognized queue options. Every field has a default, so a partial JSON
/// document (or `{}`) is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueConfig {
    /// Enqueue fails once the live queue holds this many operations.
    pub max_queue_size: usize,

    /// Period of the scheduling tick, in milliseconds.
    pub process_interval_ms: u64,

    /// Max operations dispatched concurrently per tick.
    pub max_processing_attempts: usize,

    /// Start the scheduling loop on `initialize()` when online.
    pub auto_start: bool,

    /// Write operations through to storage and reload them on `initialize()`.
    pub persist_operations: bool,

    /// How long a COMPLETED operation stays visible before it is pruned.
    pub completed_retention_ms: u64,

    pub default_priority: i32,

    pub default_max_retries: u32,

    pub retry: RetryPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 100,
            process_interval_ms: 5_000,
            max_processing_attempts: 3,
            auto_start: true,
            persist_operations: true,
            completed_retention_ms: 2_000,
            default_priority: 0,
            default_max_retries: 3,
            retry: RetryPolicy::default(),
        }
    }
}

impl QueueConfig {
    pub fn from_json_str(s: &str) -> Result<Self, QueueError> {
        let config: QueueConfig =
            serde_json::from_str(s).map_err(|e| QueueError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| QueueError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.max_queue_size == 0 {
            return Err(QueueError::Config("maxQueueSize must be > 0".into()));
        }
        if self.max_processing_attempts == 0 {
            return Err(QueueError::Config(
                "maxProcessingAttempts must be > 0".into(),
            ));
        }
        if self.process_interval_ms == 0 {
            return Err(QueueError::Config("processIntervalMs must be > 0".into()));
        }
        Ok(())
    }

    pub fn process_interval(&self) -> Duration {
        Duration::from_millis(self.process_interval_ms)
    }

    pub fn completed_retention(&self) -> Duration {
        Duration::from_millis(self.completed_retention_ms)
    }
}
