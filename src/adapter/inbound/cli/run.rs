//! Handler for the pipeline commands (`deploy`, `setup`, `check`, `start`,
//! `stop`, `restart`).

use std::future::Future;
use std::io::IsTerminal;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Local;
use futures_util::FutureExt;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use super::command::RunArgs;
use super::output;
use crate::adapter::{
    HostProbe, PolicyGate, TerminalGate, TerminalSecrets, TokioCommandRunner, TokioSleeper,
    UnixProcessTable,
};
use crate::application::pipeline::{self, PipelineKind};
use crate::application::{
    ExecutionContext, Orchestrator, Reporter, RunMode, RunSummary, Termination, Toolkit,
};
use crate::domain::AutoAnswer;
use crate::error::Result;
use crate::infrastructure::config::settings::ConfirmConfig;
use crate::infrastructure::config::Config;
use crate::port::ConfirmationGate;

/// Run one pipeline to completion, interruption or panic.
///
/// Everything that can fail happens before the run log is opened; from
/// then on a summary is emitted on every path.
pub async fn execute(config: &Config, kind: PipelineKind, args: &RunArgs) -> Result<RunSummary> {
    let mode = RunMode {
        interactive: !args.non_interactive && std::io::stdin().is_terminal(),
        dry_run: args.dry_run,
    };

    let tools = toolkit(config, args, mode);
    let pipeline = pipeline::build(kind, config, &tools)?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let terminal = if mode.interactive {
        TerminalMode::save()
    } else {
        None
    };

    let started_at = Local::now();
    let reporter = Reporter::create(&config.paths.log_dir(), kind.as_str(), started_at, output::echo())?;
    let mut ctx = ExecutionContext::new(mode, started_at, reporter);

    output::header(kind.as_str());
    if mode.dry_run {
        output::warning("Dry run: nothing will be changed");
    }
    ctx.info(format!(
        "botctl {} {kind} (run {}, install root {})",
        env!("CARGO_PKG_VERSION"),
        ctx.run_id(),
        config.paths.install_root().display()
    ));
    info!(run_id = %ctx.run_id(), pipeline = %kind, ?mode, "run started");

    let summary = supervise(kind, &pipeline, ctx, interrupt.recv()).await;
    if summary.interrupted {
        // A hidden prompt abandoned mid-read leaves echo off.
        if let Some(ref terminal) = terminal {
            terminal.restore();
        }
    }
    info!(exit_code = summary.exit_code, "run finished");
    Ok(summary)
}

/// Drive `pipeline` until it finishes, panics or `interrupt` resolves, then
/// close the run.
pub async fn supervise<F: Future>(
    kind: PipelineKind,
    pipeline: &Orchestrator,
    mut ctx: ExecutionContext,
    interrupt: F,
) -> RunSummary {
    let termination = tokio::select! {
        outcome = AssertUnwindSafe(pipeline.run(&mut ctx)).catch_unwind() => match outcome {
            Ok(report) => Termination::Completed(report),
            Err(_) => {
                error!(pipeline = %kind, "step panicked");
                Termination::Panicked
            }
        },
        _ = interrupt => Termination::Interrupted,
    };

    ctx.finish(termination)
}

/// Saved terminal attributes of stdin.
struct TerminalMode(libc::termios);

impl TerminalMode {
    fn save() -> Option<Self> {
        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr fully initializes the struct when it returns 0.
        let rc = unsafe { libc::tcgetattr(libc::STDIN_FILENO, termios.as_mut_ptr()) };
        if rc != 0 {
            return None;
        }
        Some(Self(unsafe { termios.assume_init() }))
    }

    fn restore(&self) {
        // SAFETY: the struct came from a successful tcgetattr.
        unsafe {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &self.0);
        }
    }
}

/// Real adapters for every port.
pub fn toolkit(config: &Config, args: &RunArgs, mode: RunMode) -> Toolkit {
    let sleeper = if output::is_json() || output::is_quiet() {
        TokioSleeper::default()
    } else {
        TokioSleeper::with_spinner()
    };

    Toolkit {
        runner: Arc::new(TokioCommandRunner),
        sleeper: Arc::new(sleeper),
        probe: Arc::new(HostProbe),
        processes: Arc::new(UnixProcessTable),
        gate: gate(&config.confirm, args, mode.interactive),
        secrets: Arc::new(TerminalSecrets),
    }
}

/// Explicit `--answer`s win over the config file; `--yes` accepts the rest.
/// Otherwise an interactive run asks on the terminal and a non-interactive
/// run uses the configured default.
pub fn gate(confirm: &ConfirmConfig, args: &RunArgs, interactive: bool) -> Arc<dyn ConfirmationGate> {
    let mut policy = PolicyGate::from_config(confirm);
    for (id, accept) in &args.answers {
        policy = policy.with_answer(id.clone(), *accept);
    }

    if args.yes {
        policy = policy.with_default(AutoAnswer::Accept);
    } else if interactive {
        policy = policy.with_fallback(Arc::new(TerminalGate::stdio()));
    }
    Arc::new(policy)
}
