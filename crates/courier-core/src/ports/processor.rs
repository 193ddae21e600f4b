//! OperationProcessor port - operation を外部サービスに対して実行する
//!
//! # 二つの登録方法
//! - `supported_types()` に列挙した type に対して明示的に登録
//! - 空を返すと wildcard 扱いになり、未登録の type は `can_process` で判定

use async_trait::async_trait;

use crate::domain::{Operation, OperationType, ProcessError, ProcessResult};

/// A named handler for one or more operation types.
///
/// Processors must be idempotent with respect to their external effect: the
/// queue delivers at-least-once, so the same operation can be dispatched again
/// after a crash mid-processing.
///
/// # 使用例
/// ```ignore
/// struct ProgressSync { api: ApiClient }
///
/// #[async_trait]
/// impl OperationProcessor for ProgressSync {
///     fn name(&self) -> &str { "progress-sync" }
///
///     fn supported_types(&self) -> Vec<OperationType> {
///         vec![OperationType::new("lesson.progress")]
///     }
///
///     async fn process(&self, op: &Operation) -> ProcessResult {
///         self.api.put_progress(op.data()).await.map_err(|e| ProcessError::retryable(e.to_string()))?;
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait OperationProcessor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Types this processor is registered for. Empty means wildcard.
    fn supported_types(&self) -> Vec<OperationType>;

    /// Wildcard predicate, consulted only for types with no explicit
    /// registration.
    fn can_process(&self, _op_type: &OperationType) -> bool {
        false
    }

    /// Execute one attempt.
    async fn process(&self, operation: &Operation) -> ProcessResult;

    /// Roll back / clean up after the operation was abandoned (FAILED).
    ///
    /// Best effort: errors are logged by the queue and never change the
    /// FAILED outcome.
    async fn compensate(&self, _operation: &Operation) -> Result<(), ProcessError> {
        Ok(())
    }
}
