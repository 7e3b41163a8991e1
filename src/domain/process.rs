//! Background service process types.

use std::path::PathBuf;

use serde::Serialize;

/// A live process matched by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessHandle {
    pub pid: u32,
    pub display_name: String,
    /// Where the process's output is redirected, when we launched it.
    pub log_path: Option<PathBuf>,
}

/// Everything needed to launch the service detached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub display_name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub log_path: PathBuf,
}

impl LaunchSpec {
    /// Command line as the OS process table would show it.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Graceful termination (SIGTERM).
    Terminate,
    /// Forceful termination (SIGKILL).
    Kill,
}

/// Lifecycle state of the managed service as last observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    NotRunning,
    Stopping,
    Starting,
    Running(ProcessHandle),
}

impl ServiceState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }
}

/// Which path `stop()` took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopPath {
    NotRunning,
    Graceful { pids: Vec<u32> },
    Forced { pids: Vec<u32> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_joins_program_and_args() {
        let spec = LaunchSpec {
            display_name: "discord_logo_bot.py".to_string(),
            program: PathBuf::from("/srv/bot/venv/bin/python"),
            args: vec!["discord_logo_bot.py".to_string()],
            cwd: PathBuf::from("/srv/bot"),
            env: Vec::new(),
            log_path: PathBuf::from("/srv/bot/logs/bot.log"),
        };
        assert_eq!(
            spec.command_line(),
            "/srv/bot/venv/bin/python discord_logo_bot.py"
        );
    }
}
