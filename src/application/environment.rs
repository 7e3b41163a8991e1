//! Isolated Python environment creation and package installation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::context::ExecutionContext;
use super::retry::RetryExecutor;
use crate::error::{Result, StepError};
use crate::port::{run_checked, CommandRunner, CommandSpec};

/// Marker file every virtual environment carries at its root.
const MARKER: &str = "pyvenv.cfg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentStatus {
    Created,
    Reused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    root: PathBuf,
    status: EnvironmentStatus,
}

impl Environment {
    /// True when `root` holds a usable environment.
    pub fn exists(root: &Path) -> bool {
        root.join(MARKER).is_file()
    }

    /// Open an environment that must already exist.
    pub fn at(root: &Path) -> Result<Self> {
        if !Self::exists(root) {
            return Err(StepError::MissingFile(root.join(MARKER)).into());
        }
        Ok(Self {
            root: root.to_path_buf(),
            status: EnvironmentStatus::Reused,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn status(&self) -> EnvironmentStatus {
        self.status
    }

    pub fn python(&self) -> PathBuf {
        self.bin("python")
    }

    pub fn bin(&self, name: &str) -> PathBuf {
        self.root.join("bin").join(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageFailure {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub failed: Vec<PackageFailure>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct EnvironmentBuilder {
    runner: Arc<dyn CommandRunner>,
    retry: RetryExecutor,
    interpreter: String,
}

impl EnvironmentBuilder {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        retry: RetryExecutor,
        interpreter: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            retry,
            interpreter: interpreter.into(),
        }
    }

    /// Create the environment at `path`, or reuse the one already there.
    pub async fn ensure_environment(
        &self,
        ctx: &mut ExecutionContext,
        path: &Path,
    ) -> Result<Environment> {
        if Environment::exists(path) {
            ctx.info(format!("reusing environment at {}", path.display()));
            return Ok(Environment {
                root: path.to_path_buf(),
                status: EnvironmentStatus::Reused,
            });
        }

        let spec = CommandSpec::new(&self.interpreter)
            .args(["-m", "venv"])
            .arg(path.display().to_string());
        ctx.info(format!("creating environment: {}", spec.display()));
        run_checked(self.runner.as_ref(), &spec).await?;

        if !Environment::exists(path) {
            return Err(StepError::Environment(path.to_path_buf()).into());
        }
        ctx.success(format!("created environment at {}", path.display()));
        Ok(Environment {
            root: path.to_path_buf(),
            status: EnvironmentStatus::Created,
        })
    }

    /// Upgrade pip, then install each package independently.
    ///
    /// Only the pip upgrade is retried and only its exhaustion is an error;
    /// a package that fails to install is reported and the rest continue.
    pub async fn install(
        &self,
        ctx: &mut ExecutionContext,
        env: &Environment,
        packages: &[String],
    ) -> Result<InstallReport> {
        let python = env.python().display().to_string();
        let upgrade = CommandSpec::new(&python).args(["-m", "pip", "install", "--upgrade", "pip"]);
        let runner = self.runner.as_ref();

        self.retry
            .retry(ctx, "pip upgrade", || run_checked(runner, &upgrade))
            .await
            .into_result("pip upgrade")?;
        ctx.info("pip is up to date");

        let mut report = InstallReport::default();
        for package in packages {
            let spec = CommandSpec::new(&python).args(["-m", "pip", "install"]).arg(package);
            debug!(package = %package, "installing package");
            match run_checked(runner, &spec).await {
                Ok(_) => {
                    ctx.info(format!("installed {package}"));
                    report.installed.push(package.clone());
                }
                Err(e) => {
                    let reason = match e {
                        StepError::CommandFailed { status, stderr, .. } if stderr.is_empty() => {
                            status
                        }
                        StepError::CommandFailed { stderr, .. } => stderr,
                        other => other.to_string(),
                    };
                    let failure = StepError::PackageInstall {
                        package: package.clone(),
                        reason: reason.clone(),
                    };
                    ctx.warn(failure.to_string());
                    report.failed.push(PackageFailure {
                        name: package.clone(),
                        reason,
                    });
                }
            }
        }

        if report.is_complete() {
            ctx.success(format!("installed {} packages", report.installed.len()));
        } else {
            ctx.info(format!(
                "installed {} of {} packages",
                report.installed.len(),
                packages.len()
            ));
        }
        Ok(report)
    }
}
