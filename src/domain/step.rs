//! Step outcomes and the per-run report the orchestrator builds from them.

use serde::Serialize;

/// Whether a step's failure halts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    Fatal,
    NonFatal,
}

impl Criticality {
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal)
    }
}

/// What a step action reports back when it returns without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The action ran to completion.
    Completed,
    /// The operator (or policy) answered "no" at a confirmation prompt.
    Declined,
}

/// Recorded result of one step in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    /// Precondition already satisfied; nothing to do.
    Skipped,
    Declined,
    Failed { fatal: bool, reason: String },
    /// Dry-run mode: the action would have been invoked.
    WouldRun,
    /// An earlier fatal failure halted the run before this step.
    NotRun,
}

impl StepOutcome {
    /// True when the step's action was actually invoked.
    pub fn was_executed(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Declined | Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub criticality: Criticality,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Ordered outcomes for every registered step of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    records: Vec<StepRecord>,
    halted_at: Option<String>,
}

impl RunReport {
    pub fn push(&mut self, name: &str, criticality: Criticality, outcome: StepOutcome) {
        if matches!(outcome, StepOutcome::Failed { fatal: true, .. }) && self.halted_at.is_none()
        {
            self.halted_at = Some(name.to_string());
        }
        self.records.push(StepRecord {
            name: name.to_string(),
            criticality,
            outcome,
        });
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.records
            .iter()
            .find(|record| record.name == name)
            .map(|record| &record.outcome)
    }

    /// Name of the fatal step that halted the run, if any.
    pub fn halted_at(&self) -> Option<&str> {
        self.halted_at.as_deref()
    }

    pub fn is_halted(&self) -> bool {
        self.halted_at.is_some()
    }

    /// Logical AND over every fatal step's success.
    pub fn success(&self) -> bool {
        !self
            .records
            .iter()
            .any(|record| matches!(record.outcome, StepOutcome::Failed { fatal: true, .. }))
    }

    pub fn executed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome.was_executed())
            .count()
    }
}
