//! Domain model (ids, operation, state machine, persisted record, outcome,
//! events, errors).

pub mod errors;
pub mod events;
pub mod ids;
pub mod operation;
pub mod outcome;
pub mod record;
pub mod state;

pub use errors::{QueueError, StorageError};
pub use events::{FailureKind, QueueEvent};
pub use ids::{OperationId, OperationType};
pub use operation::{EnqueueOptions, Operation};
pub use outcome::{ProcessError, ProcessResult};
pub use record::{OperationRecord, RecordPatch, SCHEMA_VERSION};
pub use state::OperationState;
