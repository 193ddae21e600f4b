//! TypedOperation trait - payload 型と operation type の対応付け

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{Operation, ProcessError};

/// Binds a payload type to its operation type string.
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct LessonProgress {
///     lesson_id: String,
///     percent: u8,
/// }
///
/// impl TypedOperation for LessonProgress {
///     const TYPE: &'static str = "lesson.progress";
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize`: enqueue 時に `data` へ書き出すため
/// - `DeserializeOwned`: dispatch 時に `data` から復元するため
/// - `Send + Sync + 'static`: processor をまたいで共有するため
pub trait TypedOperation: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;

    /// Decode the payload of `operation`. A payload that does not fit `Self`
    /// will never fit on a later attempt either, so the error is permanent.
    fn decode(operation: &Operation) -> Result<Self, ProcessError> {
        serde_json::from_value(operation.data().clone())
            .map_err(|e| ProcessError::permanent(format!("decode {} payload: {e}", Self::TYPE)))
    }
}
