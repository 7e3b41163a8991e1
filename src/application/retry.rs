//! Retry executor for flaky, network-bound operations.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use super::context::ExecutionContext;
use crate::domain::{RetryOutcome, RetryPolicy};
use crate::port::Sleeper;

/// Runs an operation under a [`RetryPolicy`], logging each failed attempt.
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Invoke `op` until it succeeds or the attempt budget is spent.
    ///
    /// Each failure is logged as a warning; exhaustion is logged as an error
    /// naming `operation`. The caller decides whether exhaustion is fatal.
    pub async fn retry<T, E, F, Fut>(
        &self,
        ctx: &mut ExecutionContext,
        operation: &str,
        mut op: F,
    ) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max = self.policy.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        ctx.info(format!("{operation} succeeded on attempt {attempt}/{max}"));
                    }
                    return RetryOutcome::Success {
                        value,
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    last_error = e.to_string();
                    match self.policy.backoff_after(attempt) {
                        Some(delay) => {
                            ctx.warn(format!(
                                "{operation} failed (attempt {attempt}/{max}): {last_error}; retrying in {}s",
                                delay.as_secs()
                            ));
                            debug!(operation, attempt, delay_ms = delay.as_millis() as u64, "backing off");
                            self.sleeper.sleep(delay).await;
                        }
                        None => {
                            ctx.warn(format!(
                                "{operation} failed (attempt {attempt}/{max}): {last_error}"
                            ));
                        }
                    }
                }
            }
        }

        ctx.error(format!("{operation} gave up after {max} attempts"));
        RetryOutcome::Exhausted {
            attempts: max,
            last_error,
        }
    }
}
