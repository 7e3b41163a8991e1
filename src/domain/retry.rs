//! Bounded retry policy with linear backoff.

use std::time::Duration;

use crate::error::StepError;

/// Attempt budget and backoff unit for a retried operation.
///
/// The delay after failed attempt `n` (1-based) is `n * backoff_unit`; no delay
/// follows the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_unit: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(5);

    /// Build a policy. `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    /// The standard three-attempt policy with a custom backoff unit.
    pub fn with_backoff(backoff_unit: Duration) -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, backoff_unit)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Delay to wait after the given failed attempt, or `None` after the last one.
    pub fn backoff_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            None
        } else {
            Some(self.backoff_unit * attempt)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BACKOFF_UNIT)
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Success { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: String },
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Convert into a step result, naming the operation on exhaustion.
    pub fn into_result(self, operation: &str) -> Result<T, StepError> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Exhausted {
                attempts,
                last_error,
            } => Err(StepError::RetryExhausted {
                operation: operation.to_string(),
                attempts,
                last_error,
            }),
        }
    }
}
