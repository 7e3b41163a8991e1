//! Modal authentication and inference app deployment.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::confirm;
use crate::application::context::ExecutionContext;
use crate::application::orchestrator::Step;
use crate::application::retry::RetryExecutor;
use crate::domain::{Criticality, Prompt, StepStatus};
use crate::error::{Result, StepError};
use crate::infrastructure::config::credentials::{Credentials, MODAL_TOKEN_ID, MODAL_TOKEN_SECRET};
use crate::port::{run_checked, CommandRunner, CommandSpec, ConfirmationGate};

/// Paths shared by the Modal steps.
#[derive(Debug, Clone)]
pub struct ModalPaths {
    /// Install root; commands run from here.
    pub root: PathBuf,
    /// The `modal` CLI inside the environment.
    pub cli: PathBuf,
    pub env_file: PathBuf,
}

impl ModalPaths {
    fn command(&self) -> CommandSpec {
        CommandSpec::new(self.cli.display().to_string()).cwd(&self.root)
    }

    /// `.env` Modal tokens, passed to child processes but never logged.
    fn with_tokens(&self, mut spec: CommandSpec) -> Result<CommandSpec> {
        let credentials = Credentials::load(&self.env_file)?;
        if let Some((id, secret)) = credentials.modal_tokens() {
            spec = spec.env(MODAL_TOKEN_ID, id).env(MODAL_TOKEN_SECRET, secret);
        }
        Ok(spec)
    }
}

pub struct ModalAuthStep {
    paths: ModalPaths,
    token_file: PathBuf,
    /// Both token variables are already exported to this process.
    env_tokens: bool,
    runner: Arc<dyn CommandRunner>,
    retry: RetryExecutor,
    gate: Arc<dyn ConfirmationGate>,
}

impl ModalAuthStep {
    pub fn new(
        paths: ModalPaths,
        token_file: PathBuf,
        env_tokens: bool,
        runner: Arc<dyn CommandRunner>,
        retry: RetryExecutor,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self {
            paths,
            token_file,
            env_tokens,
            runner,
            retry,
            gate,
        }
    }
}

#[async_trait(?Send)]
impl Step for ModalAuthStep {
    fn name(&self) -> &str {
        "modal-auth"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn is_satisfied(&self, _ctx: &mut ExecutionContext) -> Result<bool> {
        Ok(self.env_tokens || self.token_file.is_file())
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepStatus> {
        let credentials = Credentials::load(&self.paths.env_file)?;

        if let Some((id, secret)) = credentials.modal_tokens() {
            let spec = self
                .paths
                .command()
                .args(["token", "set", "--token-id", id, "--token-secret"])
                .secret_arg(secret);
            let runner = self.runner.as_ref();
            self.retry
                .retry(ctx, "modal token set", || run_checked(runner, &spec))
                .await
                .into_result("modal token set")?;
            ctx.success(format!("stored Modal token from {}", self.paths.env_file.display()));
            return Ok(StepStatus::Completed);
        }

        if !ctx.is_interactive() {
            return Err(StepError::MissingCredential(MODAL_TOKEN_ID).into());
        }

        let prompt = Prompt::new(
            "modal-token-new",
            "No Modal token found. Create one now in the browser?",
        );
        if !confirm(ctx, self.gate.as_ref(), &prompt).await? {
            return Err(StepError::MissingCredential(MODAL_TOKEN_ID).into());
        }

        let spec = self.paths.command().args(["token", "new"]).interactive();
        run_checked(self.runner.as_ref(), &spec).await?;
        ctx.success("created Modal token");
        Ok(StepStatus::Completed)
    }
}

pub struct DeployInferenceStep {
    paths: ModalPaths,
    app_file: PathBuf,
    runner: Arc<dyn CommandRunner>,
    retry: RetryExecutor,
    gate: Arc<dyn ConfirmationGate>,
}

impl DeployInferenceStep {
    pub fn new(
        paths: ModalPaths,
        app_file: PathBuf,
        runner: Arc<dyn CommandRunner>,
        retry: RetryExecutor,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self {
            paths,
            app_file,
            runner,
            retry,
            gate,
        }
    }
}

#[async_trait(?Send)]
impl Step for DeployInferenceStep {
    fn name(&self) -> &str {
        "deploy-inference"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn is_satisfied(&self, _ctx: &mut ExecutionContext) -> Result<bool> {
        Ok(false)
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepStatus> {
        let app = self.paths.root.join(&self.app_file);
        if !app.is_file() {
            return Err(StepError::MissingFile(app).into());
        }

        let prompt = Prompt::new(
            "deploy-inference",
            format!("Deploy {} to Modal?", self.app_file.display()),
        );
        if !confirm(ctx, self.gate.as_ref(), &prompt).await? {
            return Ok(StepStatus::Declined);
        }

        let spec = self.paths.with_tokens(
            self.paths
                .command()
                .arg("deploy")
                .arg(self.app_file.display().to_string()),
        )?;
        let runner = self.runner.as_ref();
        self.retry
            .retry(ctx, "modal deploy", || run_checked(runner, &spec))
            .await
            .into_result("modal deploy")?;
        ctx.success(format!("deployed {}", self.app_file.display()));
        Ok(StepStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::adapter::PolicyGate;
    use crate::application::context::RunMode;
    use crate::domain::RetryPolicy;
    use crate::testkit::{RecordingGate, RecordingSleeper, ScriptedRunner};

    fn paths(root: &std::path::Path) -> ModalPaths {
        ModalPaths {
            root: root.to_path_buf(),
            cli: root.join("venv/bin/modal"),
            env_file: root.join(".env"),
        }
    }

    fn retry() -> RetryExecutor {
        RetryExecutor::new(
            RetryPolicy::with_backoff(Duration::from_secs(1)),
            Arc::new(RecordingSleeper::default()),
        )
    }

    fn auth(root: &std::path::Path, runner: Arc<ScriptedRunner>) -> ModalAuthStep {
        ModalAuthStep::new(
            paths(root),
            root.join(".modal.toml"),
            false,
            runner,
            retry(),
            Arc::new(RecordingGate::default()),
        )
    }

    #[tokio::test]
    async fn env_tokens_are_set_without_leaking_secret() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "MODAL_TOKEN_ID=ak-123\nMODAL_TOKEN_SECRET=as-456\n",
        )
        .unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let mut ctx = ExecutionContext::in_memory(RunMode::default());

        auth(dir.path(), runner.clone()).run(&mut ctx).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].ends_with("token set --token-id ak-123 --token-secret ***"));
        assert!(ctx
            .reporter()
            .entries()
            .iter()
            .all(|entry| !entry.message.contains("as-456")));
    }

    #[tokio::test]
    async fn token_file_satisfies_auth() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".modal.toml"), "[default]\n").unwrap();
        let mut ctx = ExecutionContext::in_memory(RunMode::default());

        let step = auth(dir.path(), Arc::new(ScriptedRunner::new()));
        assert!(step.is_satisfied(&mut ctx).await.unwrap());
    }

    #[tokio::test]
    async fn missing_tokens_fail_non_interactive_auth() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let mut ctx = ExecutionContext::in_memory(RunMode::default());

        let err = auth(dir.path(), runner.clone()).run(&mut ctx).await.unwrap_err();

        assert_eq!(err.to_string(), "missing credential: MODAL_TOKEN_ID");
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn declined_deploy_never_runs_modal() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("modal_project/src/logo_generator.py");
        std::fs::create_dir_all(app.parent().unwrap()).unwrap();
        std::fs::write(&app, "import modal\n").unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let gate = Arc::new(RecordingGate::new(
            PolicyGate::accept_all().with_answer("deploy-inference", false),
        ));
        let step = DeployInferenceStep::new(
            paths(dir.path()),
            PathBuf::from("modal_project/src/logo_generator.py"),
            runner.clone(),
            retry(),
            gate.clone(),
        );
        let mut ctx = ExecutionContext::in_memory(RunMode::default());

        assert_eq!(step.run(&mut ctx).await.unwrap(), StepStatus::Declined);
        assert_eq!(gate.asked(), vec!["deploy-inference"]);
        assert_eq!(runner.count("deploy"), 0);
    }
}
