use thiserror::Error;

/// Errors surfaced synchronously by the queue API.
///
/// Processing failures are *not* in here: they are handled inside the
/// orchestrator and only show up as `QueueEvent::Failed` / operation state.
/// Storage failures are logged and never reach the caller.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is full (max {max} operations)")]
    Capacity { max: usize },

    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(String),
}

/// Errors raised by a `QueueStorage` backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported record schema version {found} (supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}
