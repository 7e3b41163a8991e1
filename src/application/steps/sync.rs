//! Repository synchronization into the install root.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::context::ExecutionContext;
use crate::application::orchestrator::Step;
use crate::application::retry::RetryExecutor;
use crate::domain::{Criticality, StepStatus};
use crate::error::{Result, StepError};
use crate::infrastructure::config::settings::RepositoryConfig;
use crate::port::{run_checked, CommandRunner, CommandSpec};

/// Pulls (fast-forward only) or clones the configured repository.
///
/// Failure is tolerated: the run continues with whatever is on disk.
pub struct SyncRepositoryStep {
    config: RepositoryConfig,
    root: PathBuf,
    runner: Arc<dyn CommandRunner>,
    retry: RetryExecutor,
}

impl SyncRepositoryStep {
    pub fn new(
        config: RepositoryConfig,
        root: PathBuf,
        runner: Arc<dyn CommandRunner>,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            config,
            root,
            runner,
            retry,
        }
    }

    fn command(&self, url: &str) -> Result<(&'static str, CommandSpec)> {
        let root = self.root.display().to_string();
        if self.root.join(".git").exists() {
            let spec = CommandSpec::new("git")
                .args(["-C", root.as_str(), "pull", "--ff-only", "origin"])
                .arg(&self.config.branch);
            return Ok(("git pull", spec));
        }

        let occupied = std::fs::read_dir(&self.root)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if occupied {
            return Err(StepError::Sync(format!(
                "{} exists and is not a git checkout",
                self.root.display()
            ))
            .into());
        }

        let spec = CommandSpec::new("git")
            .args(["clone", "--branch"])
            .arg(&self.config.branch)
            .arg(url)
            .arg(root);
        Ok(("git clone", spec))
    }
}

#[async_trait(?Send)]
impl Step for SyncRepositoryStep {
    fn name(&self) -> &str {
        "sync-repository"
    }

    fn criticality(&self) -> Criticality {
        Criticality::NonFatal
    }

    async fn is_satisfied(&self, ctx: &mut ExecutionContext) -> Result<bool> {
        if self.config.url.is_none() {
            ctx.info("no repository configured, using local files");
            return Ok(true);
        }
        Ok(false)
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepStatus> {
        let Some(url) = self.config.url.as_deref() else {
            return Ok(StepStatus::Completed);
        };
        let (operation, spec) = self.command(url)?;
        let runner = self.runner.as_ref();

        ctx.info(format!("{operation} from {url} ({})", self.config.branch));
        self.retry
            .retry(ctx, operation, || run_checked(runner, &spec))
            .await
            .into_result(operation)
            .map_err(|e| StepError::Sync(e.to_string()))?;
        Ok(StepStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::RetryPolicy;
    use crate::port::CommandOutput;
    use crate::testkit::{RecordingSleeper, ScriptedRunner};

    fn step(root: PathBuf, runner: Arc<ScriptedRunner>) -> SyncRepositoryStep {
        let config = RepositoryConfig {
            url: Some("https://example.com/logo-bot.git".to_string()),
            branch: "main".to_string(),
        };
        let retry = RetryExecutor::new(
            RetryPolicy::with_backoff(Duration::from_secs(1)),
            Arc::new(RecordingSleeper::default()),
        );
        SyncRepositoryStep::new(config, root, runner, retry)
    }

    #[tokio::test]
    async fn existing_checkout_is_pulled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let mut ctx = ExecutionContext::in_memory(Default::default());

        step(dir.path().to_path_buf(), runner.clone())
            .run(&mut ctx)
            .await
            .unwrap();

        assert_eq!(runner.count("pull --ff-only origin main"), 1);
        assert_eq!(runner.count("clone"), 0);
    }

    #[tokio::test]
    async fn missing_root_is_cloned() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("logo-bot");
        let runner = Arc::new(ScriptedRunner::new());
        let mut ctx = ExecutionContext::in_memory(Default::default());

        step(root, runner.clone()).run(&mut ctx).await.unwrap();

        assert_eq!(runner.count("git clone --branch main https://example.com/logo-bot.git"), 1);
    }

    #[tokio::test]
    async fn exhausted_pull_is_a_sync_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let runner = Arc::new(
            ScriptedRunner::new().respond("pull", CommandOutput::failed(1, "Could not resolve host")),
        );
        let mut ctx = ExecutionContext::in_memory(Default::default());

        let err = step(dir.path().to_path_buf(), runner.clone())
            .run(&mut ctx)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("repository sync failed"));
        assert_eq!(runner.count("pull"), 3);
    }
}
