//! Concrete pipeline steps.
//!
//! Each step owns the configuration slice it needs plus a [`Toolkit`] of
//! shared ports, and implements [`Step`](super::orchestrator::Step).

mod credentials;
mod environment;
mod migrate;
mod modal;
mod preflight;
mod service;
mod sync;

use std::sync::Arc;

pub use credentials::CredentialsStep;
pub use environment::{DependenciesStep, EnvironmentStep};
pub use migrate::MigrationStep;
pub use modal::{DeployInferenceStep, ModalAuthStep, ModalPaths};
pub use preflight::{run_preflight, PreflightCheck, PreflightReport, PreflightStep, ProbeStatus};
pub use service::{ServiceAction, ServiceStep};
pub use sync::SyncRepositoryStep;

use super::context::ExecutionContext;
use crate::domain::Prompt;
use crate::error::Result;
use crate::port::{
    CommandRunner, ConfirmationGate, ProcessTable, SecretInput, Sleeper, SystemProbe,
};

/// Shared ports handed to every step.
#[derive(Clone)]
pub struct Toolkit {
    pub runner: Arc<dyn CommandRunner>,
    pub sleeper: Arc<dyn Sleeper>,
    pub probe: Arc<dyn SystemProbe>,
    pub processes: Arc<dyn ProcessTable>,
    pub gate: Arc<dyn ConfirmationGate>,
    pub secrets: Arc<dyn SecretInput>,
}

/// Ask the gate and log the answer.
async fn confirm(
    ctx: &mut ExecutionContext,
    gate: &dyn ConfirmationGate,
    prompt: &Prompt,
) -> Result<bool> {
    let decision = gate.confirm(prompt).await?;
    let answer = if decision.accepted { "yes" } else { "no" };
    ctx.info(format!("{} [{}]: {answer}", prompt.text, decision.prompt_id));
    Ok(decision.accepted)
}
