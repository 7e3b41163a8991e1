//! Lifecycle control for the single long-running bot process.
//!
//! The controller finds the bot by a command-line substring, stops it with
//! SIGTERM followed by SIGKILL, and starts it detached with output redirected
//! to a log file that is truncated on every start. Nothing is monitored after
//! the settle check.

use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::context::ExecutionContext;
use crate::domain::{LaunchSpec, ProcessHandle, ServiceState, Signal, StopPath};
use crate::error::{Result, StepError};
use crate::port::{ProcessTable, Sleeper};

/// Wait after SIGKILL before declaring a process unkillable.
const KILL_WAIT: Duration = Duration::from_secs(1);

pub struct ServiceController {
    table: Arc<dyn ProcessTable>,
    sleeper: Arc<dyn Sleeper>,
    spec: LaunchSpec,
    grace: Duration,
    settle: Duration,
    state: ServiceState,
}

impl ServiceController {
    pub fn new(
        table: Arc<dyn ProcessTable>,
        sleeper: Arc<dyn Sleeper>,
        spec: LaunchSpec,
        grace: Duration,
        settle: Duration,
    ) -> Self {
        Self {
            table,
            sleeper,
            spec,
            grace,
            settle,
            state: ServiceState::NotRunning,
        }
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Live processes matching the display name.
    pub fn live_matches(&self) -> Result<Vec<u32>> {
        let pids = self.table.find(&self.spec.display_name)?;
        Ok(pids
            .into_iter()
            .filter(|pid| self.table.is_alive(*pid))
            .collect())
    }

    /// Refresh the state from the process table.
    pub fn discover(&mut self) -> Result<&ServiceState> {
        self.state = match self.live_matches()?.first() {
            Some(&pid) => ServiceState::Running(self.handle(pid)),
            None => ServiceState::NotRunning,
        };
        Ok(&self.state)
    }

    pub async fn stop(&mut self, ctx: &mut ExecutionContext) -> Result<StopPath> {
        let name = self.spec.display_name.clone();
        let pids = self.live_matches()?;
        if pids.is_empty() {
            ctx.info(format!("{name} is not running"));
            self.state = ServiceState::NotRunning;
            return Ok(StopPath::NotRunning);
        }

        self.state = ServiceState::Stopping;
        for pid in &pids {
            ctx.info(format!("sending SIGTERM to {name} (pid {pid})"));
            self.table.signal(*pid, Signal::Terminate)?;
        }
        self.sleeper.sleep(self.grace).await;

        let survivors: Vec<u32> = pids
            .iter()
            .copied()
            .filter(|pid| self.table.is_alive(*pid))
            .collect();
        if survivors.is_empty() {
            ctx.success(format!("{name} stopped gracefully"));
            self.state = ServiceState::NotRunning;
            return Ok(StopPath::Graceful { pids });
        }

        for pid in &survivors {
            ctx.warn(format!(
                "{name} (pid {pid}) ignored SIGTERM for {}s, sending SIGKILL",
                self.grace.as_secs()
            ));
            self.table.signal(*pid, Signal::Kill)?;
        }
        self.sleeper.sleep(KILL_WAIT).await;

        if let Some(&pid) = survivors.iter().find(|pid| self.table.is_alive(**pid)) {
            self.state = ServiceState::Running(self.handle(pid));
            return Err(StepError::ServiceStop { pid }.into());
        }
        ctx.success(format!("{name} killed"));
        self.state = ServiceState::NotRunning;
        Ok(StopPath::Forced { pids: survivors })
    }

    /// Start the process unless a live one already exists.
    pub async fn start(&mut self, ctx: &mut ExecutionContext) -> Result<ProcessHandle> {
        let name = self.spec.display_name.clone();
        if let Some(&pid) = self.live_matches()?.first() {
            ctx.info(format!("{name} already running (pid {pid}), not starting another"));
            let handle = self.handle(pid);
            self.state = ServiceState::Running(handle.clone());
            return Ok(handle);
        }

        self.state = ServiceState::Starting;
        let log = self.spec.log_path.clone();
        if let Some(parent) = log.parent() {
            std::fs::create_dir_all(parent)?;
        }
        File::create(&log)?;

        ctx.info(format!(
            "starting {} (output: {})",
            self.spec.command_line(),
            log.display()
        ));
        let pid = match self.table.spawn_detached(&self.spec) {
            Ok(pid) => pid,
            Err(e) => {
                self.state = ServiceState::NotRunning;
                return Err(StepError::ServiceStart {
                    reason: e.to_string(),
                    log,
                }
                .into());
            }
        };
        debug!(pid, settle_secs = self.settle.as_secs(), "waiting for process to settle");
        self.sleeper.sleep(self.settle).await;

        if !self.table.is_alive(pid) {
            self.state = ServiceState::NotRunning;
            return Err(StepError::ServiceStart {
                reason: format!("process {pid} exited within {}s", self.settle.as_secs()),
                log,
            }
            .into());
        }

        ctx.success(format!("{name} running (pid {pid})"));
        let handle = self.handle(pid);
        self.state = ServiceState::Running(handle.clone());
        Ok(handle)
    }

    pub async fn restart(&mut self, ctx: &mut ExecutionContext) -> Result<ProcessHandle> {
        self.stop(ctx).await?;
        self.start(ctx).await
    }

    fn handle(&self, pid: u32) -> ProcessHandle {
        ProcessHandle {
            pid,
            display_name: self.spec.display_name.clone(),
            log_path: Some(self.spec.log_path.clone()),
        }
    }
}
