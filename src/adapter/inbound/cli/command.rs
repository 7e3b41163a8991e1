//! Command-line interface definitions.
//!
//! Running `botctl` with no subcommand is the same as `botctl deploy`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Provision, deploy and supervise the logo bot and its Modal inference app
#[derive(Parser, Debug)]
#[command(name = "botctl")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file [default: ~/.botctl/config.toml]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase diagnostic verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Override the diagnostic log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level subcommands for the botctl CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Provision the host, deploy the inference app and restart the bot (default)
    Deploy(RunArgs),

    /// Provision only: repository, credentials, environment, packages and Modal auth
    Setup(RunArgs),

    /// Run preflight checks and report each probe
    Check,

    /// Start the bot unless it is already running
    Start(RunArgs),

    /// Stop the bot
    Stop(RunArgs),

    /// Stop the bot and start it again
    Restart(RunArgs),

    /// Show whether the bot is running
    Status,

    /// Print or follow the bot's output log
    Logs(LogsArgs),
}

impl Default for Commands {
    fn default() -> Self {
        Self::Deploy(RunArgs::default())
    }
}

/// Arguments shared by the pipeline subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Never prompt; unanswered confirmations use the configured default
    #[arg(long)]
    pub non_interactive: bool,

    /// Answer yes to every confirmation without an explicit answer
    #[arg(short, long)]
    pub yes: bool,

    /// Pre-set one confirmation, e.g. `--answer restart-bot=no` (repeatable)
    #[arg(long = "answer", value_name = "ID=yes|no", value_parser = parse_answer)]
    pub answers: Vec<(String, bool)>,

    /// Evaluate preconditions and report what would run, without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `logs` subcommand.
#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    /// Number of lines to show
    #[arg(short = 'n', long, default_value = "50")]
    pub lines: u32,

    /// Follow log output (like tail -f)
    #[arg(short, long)]
    pub follow: bool,
}

fn parse_answer(raw: &str) -> Result<(String, bool), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=yes|no, got `{raw}`"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err("prompt id must not be empty".to_string());
    }
    let accept = match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" => true,
        "no" | "n" | "false" => false,
        other => return Err(format!("expected yes or no for `{id}`, got `{other}`")),
    };
    Ok((id.to_string(), accept))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_name() {
        assert_eq!(Cli::command().get_name(), "botctl");
    }

    #[test]
    fn no_subcommand_means_deploy() {
        let cli = Cli::try_parse_from(["botctl"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(Commands::default(), Commands::Deploy(_)));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["botctl", "status", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Some(Commands::Status)));
    }

    #[test]
    fn repeated_answers_parse() {
        let cli = Cli::try_parse_from([
            "botctl",
            "deploy",
            "--non-interactive",
            "--answer",
            "restart-bot=no",
            "--answer",
            "deploy-inference=YES",
        ])
        .unwrap();

        let Some(Commands::Deploy(args)) = cli.command else {
            panic!("expected deploy");
        };
        assert!(args.non_interactive);
        assert_eq!(
            args.answers,
            vec![
                ("restart-bot".to_string(), false),
                ("deploy-inference".to_string(), true),
            ]
        );
    }

    #[test]
    fn malformed_answer_is_a_usage_error() {
        assert!(Cli::try_parse_from(["botctl", "deploy", "--answer", "restart-bot"]).is_err());
        assert!(Cli::try_parse_from(["botctl", "deploy", "--answer", "restart-bot=maybe"]).is_err());
    }

    #[test]
    fn logs_defaults() {
        let cli = Cli::try_parse_from(["botctl", "logs"]).unwrap();
        let Some(Commands::Logs(args)) = cli.command else {
            panic!("expected logs");
        };
        assert_eq!(args.lines, 50);
        assert!(!args.follow);
    }
}
