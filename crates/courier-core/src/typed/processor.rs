//! TypedProcessor - 型付き payload を受け取る processor
//!
//! - 表層: `TypedProcessor<T>` - payload は `T` にデコード済み
//! - 内部: `Typed<T, P>` が `OperationProcessor` を実装し、registry に
//!   `Arc<dyn OperationProcessor>` として格納される（type erasure）

use std::marker::PhantomData;

use async_trait::async_trait;

use super::operation::TypedOperation;
use crate::domain::{Operation, OperationType, ProcessError, ProcessResult};
use crate::ports::OperationProcessor;

/// Processor for a single typed operation.
///
/// `Handler<T>` と同じく、`TypedProcessor<LessonProgress>` は
/// `LessonProgress` しか受け取れない。
#[async_trait]
pub trait TypedProcessor<T: TypedOperation>: Send + Sync {
    async fn process(&self, payload: T, operation: &Operation) -> ProcessResult;

    async fn compensate(&self, _payload: T, _operation: &Operation) -> Result<(), ProcessError> {
        Ok(())
    }
}

/// Adapts a `TypedProcessor<T>` to the object-safe `OperationProcessor`.
pub struct Typed<T, P> {
    processor: P,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TypedOperation, P: TypedProcessor<T>> Typed<T, P> {
    pub fn new(processor: P) -> Self {
        Self {
            processor,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: TypedOperation, P: TypedProcessor<T>> OperationProcessor for Typed<T, P> {
    fn name(&self) -> &str {
        T::TYPE
    }

    fn supported_types(&self) -> Vec<OperationType> {
        vec![OperationType::new(T::TYPE)]
    }

    async fn process(&self, operation: &Operation) -> ProcessResult {
        let payload = T::decode(operation)?;
        self.processor.process(payload, operation).await
    }

    async fn compensate(&self, operation: &Operation) -> Result<(), ProcessError> {
        let payload = T::decode(operation)?;
        self.processor.compensate(payload, operation).await
    }
}
