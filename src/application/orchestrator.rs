//! Step registry and sequential runner.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use super::context::ExecutionContext;
use crate::domain::{Criticality, RunReport, StepOutcome, StepStatus};
use crate::error::{Result, StepError};

/// A named, idempotent unit of provisioning or deployment work.
#[async_trait(?Send)]
pub trait Step {
    fn name(&self) -> &str;

    fn criticality(&self) -> Criticality;

    /// True when the step's goal already holds and the action can be skipped.
    async fn is_satisfied(&self, ctx: &mut ExecutionContext) -> Result<bool>;

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepStatus>;
}

/// Ordered, immutable list of steps executed one at a time.
#[derive(Default)]
pub struct Orchestrator {
    steps: Vec<Box<dyn Step>>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step. Names must be unique within a registry.
    pub fn register(&mut self, step: Box<dyn Step>) -> Result<()> {
        if self.steps.iter().any(|s| s.name() == step.name()) {
            return Err(StepError::DuplicateStep(step.name().to_string()).into());
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn with_steps(steps: Vec<Box<dyn Step>>) -> Result<Self> {
        let mut orchestrator = Self::new();
        let mut seen = HashSet::new();
        for step in steps {
            if !seen.insert(step.name().to_string()) {
                return Err(StepError::DuplicateStep(step.name().to_string()).into());
            }
            orchestrator.steps.push(step);
        }
        Ok(orchestrator)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order.
    ///
    /// A satisfied precondition skips the step. A fatal failure halts the
    /// run and the remaining steps are recorded as not run; a non-fatal
    /// failure is counted as a warning and the run continues.
    ///
    /// Outcomes are recorded on `ctx` as each step finishes, so a run that is
    /// cut short still reports the steps it completed.
    pub async fn run(&self, ctx: &mut ExecutionContext) -> RunReport {
        let total = self.steps.len();

        if total == 0 {
            ctx.info("no steps registered");
            return ctx.report().clone();
        }

        for (index, step) in self.steps.iter().enumerate() {
            let name = step.name();
            let criticality = step.criticality();

            if ctx.report().is_halted() {
                ctx.record(name, criticality, StepOutcome::NotRun);
                continue;
            }

            ctx.info(format!("[{}/{total}] {name}", index + 1));
            debug!(step = name, ?criticality, "evaluating precondition");

            let satisfied = match step.is_satisfied(ctx).await {
                Ok(satisfied) => satisfied,
                Err(e) => {
                    let outcome = Self::failure(ctx, name, criticality, &e.to_string());
                    ctx.record(name, criticality, outcome);
                    continue;
                }
            };

            if satisfied {
                ctx.info(format!("{name}: already satisfied, skipping"));
                ctx.record(name, criticality, StepOutcome::Skipped);
                continue;
            }

            if ctx.is_dry_run() {
                ctx.info(format!("{name}: dry run, would run"));
                ctx.record(name, criticality, StepOutcome::WouldRun);
                continue;
            }

            let outcome = match step.run(ctx).await {
                Ok(StepStatus::Completed) => {
                    ctx.success(format!("{name}: done"));
                    StepOutcome::Succeeded
                }
                Ok(StepStatus::Declined) => {
                    ctx.info(format!("{name}: declined, skipping"));
                    StepOutcome::Declined
                }
                Err(e) => Self::failure(ctx, name, criticality, &e.to_string()),
            };
            ctx.record(name, criticality, outcome);
        }

        if let Some(step) = ctx.report().halted_at().map(str::to_string) {
            ctx.error(format!("run halted at {step}"));
        }
        ctx.report().clone()
    }

    fn failure(
        ctx: &mut ExecutionContext,
        name: &str,
        criticality: Criticality,
        reason: &str,
    ) -> StepOutcome {
        if criticality.is_fatal() {
            ctx.error(format!("{name} failed: {reason}"));
        } else {
            ctx.warn(format!("{name} failed, continuing: {reason}"));
        }
        StepOutcome::Failed {
            fatal: criticality.is_fatal(),
            reason: reason.to_string(),
        }
    }
}
