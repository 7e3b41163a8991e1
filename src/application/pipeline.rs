//! Step lists for each command.

use std::fmt;

use serde::Serialize;

use super::environment::EnvironmentBuilder;
use super::orchestrator::{Orchestrator, Step};
use super::retry::RetryExecutor;
use super::steps::{
    CredentialsStep, DependenciesStep, DeployInferenceStep, EnvironmentStep, MigrationStep,
    ModalAuthStep, ModalPaths, PreflightStep, ServiceAction, ServiceStep, SyncRepositoryStep,
    Toolkit,
};
use crate::domain::TextMigration;
use crate::error::Result;
use crate::infrastructure::config::credentials::{MODAL_TOKEN_ID, MODAL_TOKEN_SECRET};
use crate::infrastructure::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Full bring-up: provisioning, inference deploy and bot restart.
    Deploy,
    /// Provisioning only.
    Setup,
    /// Preflight only.
    Check,
    Start,
    Stop,
    Restart,
}

impl PipelineKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Setup => "setup",
            Self::Check => "check",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Register the steps of `kind` in execution order.
pub fn build(kind: PipelineKind, config: &Config, tools: &Toolkit) -> Result<Orchestrator> {
    let steps = match kind {
        PipelineKind::Deploy => {
            let mut steps = provisioning(config, tools);
            steps.push(Box::new(deploy_inference(config, tools)));
            steps.push(Box::new(
                service(ServiceAction::Restart, config, tools).gated(tools.gate.clone()),
            ));
            steps
        }
        PipelineKind::Setup => provisioning(config, tools),
        PipelineKind::Check => vec![preflight(config, tools)],
        PipelineKind::Start => lifecycle(ServiceAction::Start, config, tools),
        PipelineKind::Stop => lifecycle(ServiceAction::Stop, config, tools),
        PipelineKind::Restart => lifecycle(ServiceAction::Restart, config, tools),
    };
    Orchestrator::with_steps(steps)
}

fn provisioning(config: &Config, tools: &Toolkit) -> Vec<Box<dyn Step>> {
    let root = config.paths.install_root();
    let venv = config.paths.venv();

    vec![
        preflight(config, tools),
        Box::new(SyncRepositoryStep::new(
            config.repository.clone(),
            root.clone(),
            tools.runner.clone(),
            retry(config, tools),
        )),
        Box::new(CredentialsStep::new(
            config.paths.env_file(),
            tools.secrets.clone(),
        )),
        Box::new(EnvironmentStep::new(venv.clone(), builder(config, tools))),
        Box::new(DependenciesStep::new(
            venv,
            config.packages.install.clone(),
            builder(config, tools),
        )),
        Box::new(MigrationStep::new(
            "migrate-modal-lookup",
            TextMigration::modal_lookup(&config.service.script),
            root,
            tools.gate.clone(),
        )),
        Box::new(ModalAuthStep::new(
            modal_paths(config),
            config.modal.token_file(),
            modal_env_tokens(),
            tools.runner.clone(),
            retry(config, tools),
            tools.gate.clone(),
        )),
    ]
}

fn preflight(config: &Config, tools: &Toolkit) -> Box<dyn Step> {
    Box::new(PreflightStep::new(
        config.preflight.clone(),
        config.paths.install_root(),
        tools.probe.clone(),
    ))
}

fn deploy_inference(config: &Config, tools: &Toolkit) -> DeployInferenceStep {
    DeployInferenceStep::new(
        modal_paths(config),
        config.modal.app_file.clone(),
        tools.runner.clone(),
        retry(config, tools),
        tools.gate.clone(),
    )
}

/// A lone, ungated service action.
fn lifecycle(action: ServiceAction, config: &Config, tools: &Toolkit) -> Vec<Box<dyn Step>> {
    let step: Box<dyn Step> = Box::new(service(action, config, tools));
    vec![step]
}

fn service(action: ServiceAction, config: &Config, tools: &Toolkit) -> ServiceStep {
    ServiceStep::new(
        action,
        tools.processes.clone(),
        tools.sleeper.clone(),
        config.launch_spec(),
        config.service.grace(),
        config.service.settle(),
    )
}

fn retry(config: &Config, tools: &Toolkit) -> RetryExecutor {
    RetryExecutor::new(config.retry.policy(), tools.sleeper.clone())
}

fn builder(config: &Config, tools: &Toolkit) -> EnvironmentBuilder {
    EnvironmentBuilder::new(
        tools.runner.clone(),
        retry(config, tools),
        config.packages.interpreter.clone(),
    )
}

fn modal_paths(config: &Config) -> ModalPaths {
    ModalPaths {
        root: config.paths.install_root(),
        cli: config.paths.venv().join("bin").join("modal"),
        env_file: config.paths.env_file(),
    }
}

fn modal_env_tokens() -> bool {
    [MODAL_TOKEN_ID, MODAL_TOKEN_SECRET]
        .iter()
        .all(|key| std::env::var(key).is_ok_and(|v| !v.is_empty()))
}
