//! Processing outcome: what a processor reports back for one attempt.

use thiserror::Error;

/// Failure of one processing attempt.
///
/// `Retryable` drives the backoff loop. `Permanent` (e.g. the server rejected a
/// malformed payload) skips the remaining retry budget and fails immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("retryable: {0}")]
    Retryable(String),

    #[error("permanent: {0}")]
    Permanent(String),
}

impl ProcessError {
    pub fn retryable(msg: impl Into<String>) -> Self {
        Self::Retryable(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Retryable(msg) | Self::Permanent(msg) => msg,
        }
    }
}

/// Result of `OperationProcessor::process`.
///
/// `Ok(Some(value))` carries an optional result payload for observers.
pub type ProcessResult = Result<Option<serde_json::Value>, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_flag_and_message() {
        let e = ProcessError::retryable("timeout");
        assert!(e.is_retryable());
        assert_eq!(e.message(), "timeout");

        let e = ProcessError::permanent("bad request");
        assert!(!e.is_retryable());
        assert_eq!(e.to_string(), "permanent: bad request");
    }
}
