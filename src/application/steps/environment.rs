use std::path::PathBuf;

use async_trait::async_trait;

use crate::application::context::ExecutionContext;
use crate::application::environment::{Environment, EnvironmentBuilder};
use crate::application::orchestrator::Step;
use crate::domain::{Criticality, StepStatus};
use crate::error::Result;

/// Written into the environment after every package installed cleanly.
const STAMP: &str = ".botctl-packages";

pub struct EnvironmentStep {
    venv: PathBuf,
    builder: EnvironmentBuilder,
}

impl EnvironmentStep {
    pub fn new(venv: PathBuf, builder: EnvironmentBuilder) -> Self {
        Self { venv, builder }
    }
}

#[async_trait(?Send)]
impl Step for EnvironmentStep {
    fn name(&self) -> &str {
        "environment"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn is_satisfied(&self, _ctx: &mut ExecutionContext) -> Result<bool> {
        Ok(Environment::exists(&self.venv))
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepStatus> {
        self.builder.ensure_environment(ctx, &self.venv).await?;
        Ok(StepStatus::Completed)
    }
}

/// Installs the declared packages. Skipped once the same list has been
/// installed without failures.
pub struct DependenciesStep {
    venv: PathBuf,
    packages: Vec<String>,
    builder: EnvironmentBuilder,
}

impl DependenciesStep {
    pub fn new(venv: PathBuf, packages: Vec<String>, builder: EnvironmentBuilder) -> Self {
        Self {
            venv,
            packages,
            builder,
        }
    }

    fn stamp(&self) -> String {
        let mut stamp = self.packages.join("\n");
        stamp.push('\n');
        stamp
    }
}

#[async_trait(?Send)]
impl Step for DependenciesStep {
    fn name(&self) -> &str {
        "dependencies"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn is_satisfied(&self, _ctx: &mut ExecutionContext) -> Result<bool> {
        let installed = std::fs::read_to_string(self.venv.join(STAMP)).unwrap_or_default();
        Ok(installed == self.stamp())
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepStatus> {
        let env = Environment::at(&self.venv)?;
        let report = self.builder.install(ctx, &env, &self.packages).await?;
        if report.is_complete() {
            std::fs::write(env.root().join(STAMP), self.stamp())?;
        }
        Ok(StepStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::application::retry::RetryExecutor;
    use crate::domain::RetryPolicy;
    use crate::port::CommandOutput;
    use crate::testkit::{RecordingSleeper, ScriptedRunner};

    fn builder(runner: Arc<ScriptedRunner>) -> EnvironmentBuilder {
        let retry = RetryExecutor::new(
            RetryPolicy::with_backoff(Duration::from_secs(1)),
            Arc::new(RecordingSleeper::default()),
        );
        EnvironmentBuilder::new(runner, retry, "python3")
    }

    #[tokio::test]
    async fn clean_install_makes_step_satisfied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pyvenv.cfg"), "").unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let step = DependenciesStep::new(
            dir.path().to_path_buf(),
            vec!["modal".to_string()],
            builder(runner),
        );
        let mut ctx = ExecutionContext::in_memory(Default::default());

        assert!(!step.is_satisfied(&mut ctx).await.unwrap());
        step.run(&mut ctx).await.unwrap();
        assert!(step.is_satisfied(&mut ctx).await.unwrap());
    }

    #[tokio::test]
    async fn partial_install_is_retried_next_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pyvenv.cfg"), "").unwrap();
        let runner = Arc::new(
            ScriptedRunner::new().respond("pip install modal", CommandOutput::failed(1, "boom")),
        );
        let step = DependenciesStep::new(
            dir.path().to_path_buf(),
            vec!["modal".to_string()],
            builder(runner),
        );
        let mut ctx = ExecutionContext::in_memory(Default::default());

        step.run(&mut ctx).await.unwrap();
        assert!(!step.is_satisfied(&mut ctx).await.unwrap());
    }
}
