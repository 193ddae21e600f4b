//! Retry policy: decides backoff delays.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff with a hard ceiling.
///
/// delay(k) = min(base_delay * 2^k, max_delay), where `k` is the number of
/// retries already made.
///
/// Example with base_delay=1s, max_delay=30s:
/// - k=0: 1s
/// - k=1: 2s
/// - k=2: 4s
/// - k=4: 16s
/// - k=5: 30s (capped)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,

    /// Ceiling for any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay_ms: base_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay before the next retry, given how many retries were already made.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        // 2^63 already overflows any realistic base; clamp the shift.
        let factor = 1u64.checked_shl(retry_count.min(63)).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}
