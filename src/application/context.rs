//! Per-run execution context and the guaranteed run summary.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::reporter::{Echo, Reporter};
use crate::domain::{Criticality, RunReport, StepOutcome, StepRecord};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// Usage or configuration error detected before any step ran.
pub const EXIT_USAGE: i32 = 2;
/// Conventional 128 + SIGINT.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Mode flags fixed for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMode {
    /// A human can answer prompts on this terminal.
    pub interactive: bool,
    /// Evaluate preconditions only; never invoke step actions.
    pub dry_run: bool,
}

/// How the run ended.
#[derive(Debug)]
pub enum Termination {
    Completed(RunReport),
    Interrupted,
    /// A step panicked; the pipeline could not finish.
    Panicked,
}

/// Totals emitted once at the end of every run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub errors: u32,
    pub warnings: u32,
    pub log_path: Option<PathBuf>,
    pub error_log_path: Option<PathBuf>,
    pub exit_code: i32,
    pub interrupted: bool,
    pub elapsed_secs: f64,
    pub steps: Vec<StepRecord>,
}

/// State that spans one run: mode flags, start time, the reporter that
/// owns the counters and the step outcomes recorded so far. Lent by `&mut`
/// to every step; never cloned.
pub struct ExecutionContext {
    run_id: Uuid,
    started_at: DateTime<Local>,
    mode: RunMode,
    reporter: Reporter,
    report: RunReport,
}

impl ExecutionContext {
    pub fn new(mode: RunMode, started_at: DateTime<Local>, reporter: Reporter) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            mode,
            reporter,
            report: RunReport::default(),
        }
    }

    /// Context with an in-memory, silent reporter.
    pub fn in_memory(mode: RunMode) -> Self {
        Self::new(mode, Local::now(), Reporter::in_memory())
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn is_interactive(&self) -> bool {
        self.mode.interactive
    }

    pub fn is_dry_run(&self) -> bool {
        self.mode.dry_run
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.reporter.info(message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.reporter.success(message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.reporter.warn(message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.reporter.error(message);
    }

    pub fn errors(&self) -> u32 {
        self.reporter.errors()
    }

    pub fn warnings(&self) -> u32 {
        self.reporter.warnings()
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Record the outcome of a finished step.
    pub fn record(&mut self, name: &str, criticality: Criticality, outcome: StepOutcome) {
        self.report.push(name, criticality, outcome);
    }

    /// Outcomes recorded so far in this run.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Close the run: log the outcome, emit the summary and compute the exit code.
    ///
    /// The exit code is non-zero only when a fatal step failed or the run did
    /// not complete; warnings never affect it.
    pub fn finish(mut self, termination: Termination) -> RunSummary {
        let (exit_code, interrupted, steps) = match termination {
            Termination::Completed(report) => {
                let code = if report.success() {
                    EXIT_SUCCESS
                } else {
                    EXIT_FAILURE
                };
                (code, false, report.records().to_vec())
            }
            Termination::Interrupted => {
                self.reporter.error("run interrupted by operator");
                (EXIT_INTERRUPTED, true, self.report.records().to_vec())
            }
            Termination::Panicked => {
                self.reporter.error("run aborted by an internal error");
                (EXIT_FAILURE, false, self.report.records().to_vec())
            }
        };

        let elapsed = Local::now() - self.started_at;
        let summary = RunSummary {
            run_id: self.run_id,
            errors: self.reporter.errors(),
            warnings: self.reporter.warnings(),
            log_path: self.reporter.log_path().map(PathBuf::from),
            error_log_path: self.reporter.errors_path().map(PathBuf::from),
            exit_code,
            interrupted,
            elapsed_secs: elapsed.num_milliseconds() as f64 / 1000.0,
            steps,
        };

        self.reporter.append_quiet(format!(
            "summary: run={} errors={} warnings={} exit={} elapsed={:.1}s",
            summary.run_id,
            summary.errors,
            summary.warnings,
            summary.exit_code,
            summary.elapsed_secs
        ));
        print_summary(self.reporter.echo(), &summary);
        summary
    }
}

fn print_summary(echo: Echo, summary: &RunSummary) {
    match echo {
        Echo::Silent => {}
        Echo::Json => {
            println!("{}", json!({ "type": "summary", "payload": summary }));
        }
        Echo::Human | Echo::Quiet => {
            if echo == Echo::Human {
                println!();
                println!("{}", "Summary".bold());
            }
            println!("  {:<12} {}", "Errors".dimmed(), summary.errors);
            println!("  {:<12} {}", "Warnings".dimmed(), summary.warnings);
            if let Some(ref path) = summary.log_path {
                println!("  {:<12} {}", "Log".dimmed(), path.display());
            }
            if let Some(ref path) = summary.error_log_path {
                println!("  {:<12} {}", "Error log".dimmed(), path.display());
            }
            let result = match summary.exit_code {
                EXIT_SUCCESS => format!("{}", "success".green()),
                EXIT_INTERRUPTED => format!("{} (exit {})", "interrupted".yellow(), summary.exit_code),
                code => format!("{} (exit {code})", "failed".red()),
            };
            println!("  {:<12} {}", "Result".dimmed(), result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_run_finishes_successfully() {
        let ctx = ExecutionContext::in_memory(RunMode::default());
        let summary = ctx.finish(Termination::Completed(RunReport::default()));

        assert_eq!(summary.exit_code, EXIT_SUCCESS);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.warnings, 0);
        assert!(summary.steps.is_empty());
    }

    #[test]
    fn warnings_do_not_change_exit_code() {
        let mut ctx = ExecutionContext::in_memory(RunMode::default());
        ctx.warn("optional package failed");
        let summary = ctx.finish(Termination::Completed(RunReport::default()));

        assert_eq!(summary.exit_code, EXIT_SUCCESS);
        assert_eq!(summary.warnings, 1);
    }

    #[test]
    fn fatal_failure_sets_failure_exit_code() {
        let mut report = RunReport::default();
        report.push(
            "preflight",
            Criticality::Fatal,
            StepOutcome::Failed {
                fatal: true,
                reason: "offline".to_string(),
            },
        );
        let ctx = ExecutionContext::in_memory(RunMode::default());
        let summary = ctx.finish(Termination::Completed(report));

        assert_eq!(summary.exit_code, EXIT_FAILURE);
        assert_eq!(summary.steps.len(), 1);
    }

    #[test]
    fn interrupt_uses_reserved_exit_code() {
        let ctx = ExecutionContext::in_memory(RunMode::default());
        let summary = ctx.finish(Termination::Interrupted);

        assert_eq!(summary.exit_code, EXIT_INTERRUPTED);
        assert!(summary.interrupted);
        assert_eq!(summary.errors, 1);
    }

    #[test]
    fn interrupt_keeps_outcomes_of_finished_steps() {
        let mut ctx = ExecutionContext::in_memory(RunMode::default());
        ctx.record("preflight", Criticality::Fatal, StepOutcome::Succeeded);
        let summary = ctx.finish(Termination::Interrupted);

        assert_eq!(summary.steps.len(), 1);
        assert_eq!(summary.steps[0].name, "preflight");
        assert_eq!(summary.steps[0].outcome, StepOutcome::Succeeded);
    }
}
