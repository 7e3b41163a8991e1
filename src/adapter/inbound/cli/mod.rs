//! CLI module graph and command dispatch.

pub mod command;
pub mod logs;
pub mod output;
pub mod run;
pub mod status;

use crate::application::context::{EXIT_FAILURE, EXIT_USAGE};
use crate::application::PipelineKind;
use crate::error::{Error, Result};
use crate::infrastructure::config::{paths, Config};

use command::{Cli, Commands, RunArgs};

/// Run the parsed command line and return the process exit code.
pub async fn dispatch(cli: &Cli) -> i32 {
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            output::error(&e.to_string());
            return EXIT_USAGE;
        }
    };

    let command = cli.command.clone().unwrap_or_default();
    let result = match command {
        Commands::Deploy(args) => pipeline(&config, PipelineKind::Deploy, &args).await,
        Commands::Setup(args) => pipeline(&config, PipelineKind::Setup, &args).await,
        Commands::Check => pipeline(&config, PipelineKind::Check, &RunArgs::default()).await,
        Commands::Start(args) => pipeline(&config, PipelineKind::Start, &args).await,
        Commands::Stop(args) => pipeline(&config, PipelineKind::Stop, &args).await,
        Commands::Restart(args) => pipeline(&config, PipelineKind::Restart, &args).await,
        Commands::Status => status::execute(&config),
        Commands::Logs(args) => logs::execute(&config, &args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            output::error(&e.to_string());
            match e {
                Error::Config(_) => EXIT_USAGE,
                _ => EXIT_FAILURE,
            }
        }
    }
}

async fn pipeline(config: &Config, kind: PipelineKind, args: &RunArgs) -> Result<i32> {
    let summary = run::execute(config, kind, args).await?;
    Ok(summary.exit_code)
}

/// Load the explicit `--config` (which must exist) or the optional default
/// file, then start diagnostic logging.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => Config::load(path)?,
        None => Config::load_or_default(paths::default_config())?,
    };

    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    } else if output::verbosity() > 0 {
        config.logging.level = match output::verbosity() {
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
        .to_string();
    }
    if output::is_json() {
        config.logging.format = "json".to_string();
    }
    config.logging.init();
    Ok(config)
}
