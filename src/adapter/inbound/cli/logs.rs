//! Handler for the `logs` command.

use std::process::Command;

use super::command::LogsArgs;
use super::output;
use crate::error::Result;
use crate::infrastructure::config::Config;

/// Print or follow the bot's redirect log with `tail`. Returns the exit code.
pub fn execute(config: &Config, args: &LogsArgs) -> Result<i32> {
    let log_path = config.launch_spec().log_path;
    if !log_path.exists() {
        output::error(&format!("no service log at {}", log_path.display()));
        output::hint("the log is created when the bot starts: `botctl start`");
        return Ok(1);
    }

    let mut cmd = Command::new("tail");
    cmd.args(["-n", &args.lines.to_string()]);
    if args.follow {
        cmd.arg("-f");
    }
    cmd.arg(&log_path);

    // Streams straight to the terminal.
    let status = cmd.status()?;
    Ok(status.code().unwrap_or(1))
}
