//! End-to-end pipeline runs against the in-memory testkit.

use std::path::Path;
use std::sync::Arc;

use botctl::adapter::PolicyGate;
use botctl::application::context::{EXIT_FAILURE, EXIT_SUCCESS};
use botctl::application::pipeline::{build, PipelineKind};
use botctl::application::{ExecutionContext, RunMode, RunSummary, Termination};
use botctl::domain::{RunReport, StepOutcome};
use botctl::infrastructure::config::Config;
use botctl::port::CommandOutput;
use botctl::testkit::{config_in, FakeProbe, Fakes, RecordingGate, ScriptedRunner};

const BOT_SCRIPT: &str = "import modal\nfn = modal.Function.lookup(\"logo\", \"generate\")\n";

/// An install root with a checked-out bot, credentials and a Modal token.
fn seeded_root(root: &Path) {
    std::fs::write(root.join("discord_logo_bot.py"), BOT_SCRIPT).unwrap();
    std::fs::write(root.join(".env"), "DISCORD_BOT_TOKEN=abc.def\n").unwrap();
    std::fs::write(root.join(".modal.toml"), "[default]\ntoken_id = \"ak\"\n").unwrap();
    let app = root.join("modal_project/src/logo_generator.py");
    std::fs::create_dir_all(app.parent().unwrap()).unwrap();
    std::fs::write(app, "import modal\n").unwrap();
}

/// Runner for a fresh host: `venv` creates the marker file.
fn fresh_host_runner(root: &Path) -> ScriptedRunner {
    ScriptedRunner::new().creates_on("-m venv", root.join("venv/pyvenv.cfg"))
}

async fn run(kind: PipelineKind, config: &Config, fakes: &Fakes) -> (RunReport, RunSummary) {
    let pipeline = build(kind, config, &fakes.toolkit()).unwrap();
    let mut ctx = ExecutionContext::in_memory(RunMode::default());
    let report = pipeline.run(&mut ctx).await;
    let summary = ctx.finish(Termination::Completed(report.clone()));
    (report, summary)
}

#[tokio::test]
async fn fresh_deploy_with_one_failed_package_succeeds_with_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    seeded_root(dir.path());
    let fakes = Fakes {
        runner: Arc::new(
            fresh_host_runner(dir.path())
                .respond("pip install modal", CommandOutput::failed(1, "ERROR: no matching distribution")),
        ),
        gate: Arc::new(RecordingGate::new(PolicyGate::accept_all())),
        ..Fakes::default()
    };

    let (report, summary) = run(PipelineKind::Deploy, &config_in(dir.path()), &fakes).await;

    assert_eq!(summary.exit_code, EXIT_SUCCESS);
    assert_eq!(summary.warnings, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(report.outcome("environment"), Some(&StepOutcome::Succeeded));
    assert_eq!(report.outcome("dependencies"), Some(&StepOutcome::Succeeded));
    assert_eq!(report.outcome("sync-repository"), Some(&StepOutcome::Skipped));
    assert_eq!(report.outcome("restart-bot"), Some(&StepOutcome::Succeeded));

    assert_eq!(fakes.runner.count("pip install --upgrade pip"), 1);
    assert_eq!(fakes.runner.count(" deploy "), 1);
    assert_eq!(fakes.processes.live_matching("discord_logo_bot.py").len(), 1);

    let script = std::fs::read_to_string(dir.path().join("discord_logo_bot.py")).unwrap();
    assert!(script.contains("modal.Function.from_name("));
}

#[tokio::test]
async fn offline_preflight_halts_before_anything_runs() {
    let dir = tempfile::tempdir().unwrap();
    seeded_root(dir.path());
    let fakes = Fakes {
        probe: Arc::new(FakeProbe::default().offline()),
        gate: Arc::new(RecordingGate::new(PolicyGate::accept_all())),
        ..Fakes::default()
    };

    let (report, summary) = run(PipelineKind::Deploy, &config_in(dir.path()), &fakes).await;

    assert_eq!(summary.exit_code, EXIT_FAILURE);
    assert_eq!(report.halted_at(), Some("preflight"));
    assert_eq!(report.executed_count(), 1);
    assert!(report
        .records()
        .iter()
        .skip(1)
        .all(|record| record.outcome == StepOutcome::NotRun));
    assert!(fakes.runner.calls().is_empty());
    assert!(fakes.gate.asked().is_empty());
    assert!(fakes.processes.launches().is_empty());
    assert!(!dir.path().join("venv").exists());
}

#[tokio::test]
async fn restart_replaces_the_live_process_and_truncates_its_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let log_path = config.launch_spec().log_path;
    std::fs::create_dir_all(log_path.parent().unwrap()).unwrap();
    std::fs::write(&log_path, "output of the previous process\n").unwrap();

    let fakes = Fakes::default();
    let old = fakes
        .processes
        .insert_running("/srv/bot/venv/bin/python discord_logo_bot.py");

    let (_, summary) = run(PipelineKind::Restart, &config, &fakes).await;

    assert_eq!(summary.exit_code, EXIT_SUCCESS);
    let live = fakes.processes.live_matching("discord_logo_bot.py");
    assert_eq!(live.len(), 1);
    assert_ne!(live[0], old);
    assert_eq!(fakes.processes.launches().len(), 1);

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(log, format!("pid {} started\n", live[0]));
}

#[tokio::test]
async fn declined_prompts_never_mutate() {
    let dir = tempfile::tempdir().unwrap();
    seeded_root(dir.path());
    let fakes = Fakes {
        runner: Arc::new(fresh_host_runner(dir.path())),
        gate: Arc::new(RecordingGate::new(
            PolicyGate::accept_all()
                .with_answer("migrate-modal-lookup-v1", false)
                .with_answer("deploy-inference", false)
                .with_answer("restart-bot", false),
        )),
        ..Fakes::default()
    };
    let running = fakes.processes.insert_running("python discord_logo_bot.py");

    let (report, summary) = run(PipelineKind::Deploy, &config_in(dir.path()), &fakes).await;

    assert_eq!(summary.exit_code, EXIT_SUCCESS);
    for step in ["migrate-modal-lookup", "deploy-inference", "restart-bot"] {
        assert_eq!(report.outcome(step), Some(&StepOutcome::Declined), "{step}");
    }
    assert_eq!(
        fakes.gate.asked(),
        vec!["migrate-modal-lookup-v1", "deploy-inference", "restart-bot"]
    );
    assert_eq!(fakes.runner.count(" deploy "), 0);
    assert!(fakes.processes.signals().is_empty());
    assert!(fakes.processes.launches().is_empty());
    assert_eq!(fakes.processes.live_matching("discord_logo_bot.py"), vec![running]);

    let script = std::fs::read_to_string(dir.path().join("discord_logo_bot.py")).unwrap();
    assert_eq!(script, BOT_SCRIPT);
}

#[tokio::test]
async fn second_setup_reuses_environment_and_packages() {
    let dir = tempfile::tempdir().unwrap();
    seeded_root(dir.path());
    let fakes = Fakes {
        runner: Arc::new(fresh_host_runner(dir.path())),
        gate: Arc::new(RecordingGate::new(PolicyGate::accept_all())),
        ..Fakes::default()
    };
    let config = config_in(dir.path());

    let (_, first) = run(PipelineKind::Setup, &config, &fakes).await;
    let calls_after_first = fakes.runner.calls().len();
    let (report, second) = run(PipelineKind::Setup, &config, &fakes).await;

    assert_eq!(first.exit_code, EXIT_SUCCESS);
    assert_eq!(second.exit_code, EXIT_SUCCESS);
    assert_eq!(fakes.runner.count("-m venv"), 1);
    assert_eq!(fakes.runner.calls().len(), calls_after_first);
    for step in ["environment", "dependencies", "migrate-modal-lookup", "modal-auth"] {
        assert_eq!(report.outcome(step), Some(&StepOutcome::Skipped), "{step}");
    }
}

#[tokio::test]
async fn dry_run_invokes_no_actions() {
    let dir = tempfile::tempdir().unwrap();
    seeded_root(dir.path());
    let fakes = Fakes {
        gate: Arc::new(RecordingGate::new(PolicyGate::accept_all())),
        ..Fakes::default()
    };
    let pipeline = build(PipelineKind::Deploy, &config_in(dir.path()), &fakes.toolkit()).unwrap();
    let mut ctx = ExecutionContext::in_memory(RunMode {
        interactive: false,
        dry_run: true,
    });

    let report = pipeline.run(&mut ctx).await;

    assert!(report.success());
    assert_eq!(report.outcome("environment"), Some(&StepOutcome::WouldRun));
    assert_eq!(report.outcome("restart-bot"), Some(&StepOutcome::WouldRun));
    assert!(fakes.runner.calls().is_empty());
    assert!(fakes.gate.asked().is_empty());
    assert!(fakes.processes.launches().is_empty());
}
