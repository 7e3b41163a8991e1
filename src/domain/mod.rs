//! Deployment domain types, free of IO.

pub mod decision;
pub mod log;
pub mod migration;
pub mod process;
pub mod retry;
pub mod step;

pub use decision::{AutoAnswer, Decision, Prompt};
pub use log::{LogEntry, LogLevel};
pub use migration::TextMigration;
pub use process::{LaunchSpec, ProcessHandle, ServiceState, Signal, StopPath};
pub use retry::{RetryOutcome, RetryPolicy};
pub use step::{Criticality, RunReport, StepOutcome, StepRecord, StepStatus};
