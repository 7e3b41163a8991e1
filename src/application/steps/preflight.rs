//! Host readiness checks run before anything is mutated.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::application::context::ExecutionContext;
use crate::application::orchestrator::Step;
use crate::domain::{Criticality, StepStatus};
use crate::error::{Result, StepError};
use crate::infrastructure::config::settings::PreflightConfig;
use crate::port::SystemProbe;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "details", rename_all = "lowercase")]
pub enum ProbeStatus {
    Passed(String),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PreflightCheck {
    name: String,
    status: ProbeStatus,
}

impl PreflightCheck {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &ProbeStatus {
        &self.status
    }

    pub fn passed(&self) -> bool {
        matches!(self.status, ProbeStatus::Passed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    checks: Vec<PreflightCheck>,
}

impl PreflightReport {
    pub fn checks(&self) -> &[PreflightCheck] {
        &self.checks
    }

    pub fn passed(&self) -> bool {
        self.checks.iter().all(PreflightCheck::passed)
    }

    pub fn failures(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter_map(|check| match &check.status {
                ProbeStatus::Failed(reason) => Some(format!("{}: {reason}", check.name)),
                ProbeStatus::Passed(_) => None,
            })
            .collect()
    }
}

/// Probe required tools, free disk space under `root` and connectivity.
pub async fn run_preflight(
    config: &PreflightConfig,
    root: &std::path::Path,
    probe: &dyn SystemProbe,
) -> PreflightReport {
    let mut checks = Vec::new();

    for tool in &config.tools {
        checks.push(PreflightCheck {
            name: format!("tool {tool}"),
            status: match probe.find_tool(tool) {
                Some(path) => ProbeStatus::Passed(path.display().to_string()),
                None => ProbeStatus::Failed("not found on PATH".to_string()),
            },
        });
    }

    let needed = config.min_free_bytes();
    checks.push(PreflightCheck {
        name: "disk space".to_string(),
        status: match probe.free_space(root) {
            Ok(free) if free >= needed => ProbeStatus::Passed(format!("{} MB free", free / MB)),
            Ok(free) => ProbeStatus::Failed(format!(
                "{} MB free, {} MB required",
                free / MB,
                config.min_free_mb
            )),
            Err(e) => ProbeStatus::Failed(e.to_string()),
        },
    });

    let url = &config.connectivity_url;
    checks.push(PreflightCheck {
        name: "connectivity".to_string(),
        status: if probe.reachable(url, config.connectivity_timeout()).await {
            ProbeStatus::Passed(url.clone())
        } else {
            ProbeStatus::Failed(format!(
                "{url} unreachable within {}s",
                config.connectivity_timeout_secs
            ))
        },
    });

    PreflightReport { checks }
}

const MB: u64 = 1024 * 1024;

pub struct PreflightStep {
    config: PreflightConfig,
    root: PathBuf,
    probe: Arc<dyn SystemProbe>,
}

impl PreflightStep {
    pub fn new(config: PreflightConfig, root: PathBuf, probe: Arc<dyn SystemProbe>) -> Self {
        Self {
            config,
            root,
            probe,
        }
    }
}

#[async_trait(?Send)]
impl Step for PreflightStep {
    fn name(&self) -> &str {
        "preflight"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn is_satisfied(&self, _ctx: &mut ExecutionContext) -> Result<bool> {
        Ok(false)
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepStatus> {
        let report = run_preflight(&self.config, &self.root, self.probe.as_ref()).await;
        for check in report.checks() {
            match check.status() {
                ProbeStatus::Passed(details) => ctx.info(format!("{}: ok ({details})", check.name())),
                ProbeStatus::Failed(reason) => ctx.info(format!("{}: FAILED ({reason})", check.name())),
            }
        }
        if !report.passed() {
            return Err(StepError::Preflight(report.failures().join("; ")).into());
        }
        Ok(StepStatus::Completed)
    }
}
