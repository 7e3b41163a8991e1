//! Subprocess runner on tokio's process API.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::port::{CommandOutput, CommandRunner, CommandSpec};

/// Runs commands as real child processes.
///
/// Captured commands get a null stdin so a tool that unexpectedly prompts
/// fails instead of hanging. Interactive commands inherit the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args).kill_on_drop(true);
        if let Some(ref cwd) = spec.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        debug!(command = %spec.display(), interactive = spec.interactive, "spawning");

        if spec.interactive {
            let status = command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await?;
            return Ok(CommandOutput {
                code: status.code(),
                ..CommandOutput::default()
            });
        }

        let output = command.stdin(Stdio::null()).output().await?;
        debug!(command = %spec.display(), code = ?output.status.code(), "finished");
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_exit_code_and_stderr() {
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo broken >&2; exit 3"]);
        let output = TokioCommandRunner.run(&spec).await.unwrap();

        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "broken");
    }

    #[tokio::test]
    async fn passes_cwd_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("sh")
            .args(["-c", "pwd; echo $BOTCTL_TEST_VALUE"])
            .cwd(dir.path())
            .env("BOTCTL_TEST_VALUE", "42");
        let output = TokioCommandRunner.run(&spec).await.unwrap();

        let lines: Vec<_> = output.stdout.lines().collect();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(std::path::Path::new(lines[0]).canonicalize().unwrap(), expected);
        assert_eq!(lines[1], "42");
    }

    #[tokio::test]
    async fn missing_program_is_an_io_error() {
        let spec = CommandSpec::new("botctl-no-such-program");
        assert!(TokioCommandRunner.run(&spec).await.is_err());
    }
}
