use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::confirm;
use crate::application::context::ExecutionContext;
use crate::application::orchestrator::Step;
use crate::application::service::ServiceController;
use crate::domain::{Criticality, LaunchSpec, Prompt, StepStatus};
use crate::error::Result;
use crate::port::{ConfirmationGate, ProcessTable, Sleeper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    fn step_name(self) -> &'static str {
        match self {
            Self::Start => "start-bot",
            Self::Stop => "stop-bot",
            Self::Restart => "restart-bot",
        }
    }
}

/// Drives the [`ServiceController`] for one lifecycle action, optionally
/// behind a confirmation prompt named after the step.
pub struct ServiceStep {
    action: ServiceAction,
    gate: Option<Arc<dyn ConfirmationGate>>,
    processes: Arc<dyn ProcessTable>,
    sleeper: Arc<dyn Sleeper>,
    spec: LaunchSpec,
    grace: Duration,
    settle: Duration,
}

impl ServiceStep {
    pub fn new(
        action: ServiceAction,
        processes: Arc<dyn ProcessTable>,
        sleeper: Arc<dyn Sleeper>,
        spec: LaunchSpec,
        grace: Duration,
        settle: Duration,
    ) -> Self {
        Self {
            action,
            gate: None,
            processes,
            sleeper,
            spec,
            grace,
            settle,
        }
    }

    pub fn gated(mut self, gate: Arc<dyn ConfirmationGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn controller(&self) -> ServiceController {
        ServiceController::new(
            self.processes.clone(),
            self.sleeper.clone(),
            self.spec.clone(),
            self.grace,
            self.settle,
        )
    }
}

#[async_trait(?Send)]
impl Step for ServiceStep {
    fn name(&self) -> &str {
        self.action.step_name()
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn is_satisfied(&self, _ctx: &mut ExecutionContext) -> Result<bool> {
        let running = !self.controller().live_matches()?.is_empty();
        Ok(match self.action {
            ServiceAction::Start => running,
            ServiceAction::Stop => !running,
            ServiceAction::Restart => false,
        })
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepStatus> {
        if let Some(ref gate) = self.gate {
            let prompt = Prompt::new(
                self.action.step_name(),
                format!("{} {}?", verb(self.action), self.spec.display_name),
            );
            if !confirm(ctx, gate.as_ref(), &prompt).await? {
                return Ok(StepStatus::Declined);
            }
        }

        let mut controller = self.controller();
        match self.action {
            ServiceAction::Start => {
                controller.start(ctx).await?;
            }
            ServiceAction::Stop => {
                controller.stop(ctx).await?;
            }
            ServiceAction::Restart => {
                controller.restart(ctx).await?;
            }
        }
        Ok(StepStatus::Completed)
    }
}

fn verb(action: ServiceAction) -> &'static str {
    match action {
        ServiceAction::Start => "Start",
        ServiceAction::Stop => "Stop",
        ServiceAction::Restart => "Restart",
    }
}
