use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;

/// A config rooted in `dir` whose preflight probes `url` and nothing else
/// can fail.
fn config_probing(dir: &Path, url: &str, timeout_secs: u64) -> PathBuf {
    let path = dir.join("config.toml");
    let contents = format!(
        concat!(
            "[paths]\n",
            "install_root = \"{root}\"\n",
            "\n",
            "[preflight]\n",
            "tools = [\"sh\"]\n",
            "min_free_mb = 1\n",
            "connectivity_url = \"{url}\"\n",
            "connectivity_timeout_secs = {timeout}\n",
        ),
        root = dir.join("bot").display(),
        url = url,
        timeout = timeout_secs,
    );
    std::fs::write(&path, contents).unwrap();
    path
}

/// A config rooted in `dir` whose preflight can only fail on connectivity.
fn offline_config(dir: &Path) -> PathBuf {
    config_probing(dir, "http://127.0.0.1:9/", 1)
}

const PROXY_VARS: [&str; 6] = [
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
];

fn botctl() -> Command {
    let mut cmd = Command::cargo_bin("botctl").unwrap();
    cmd.env_remove("BOTCTL_INSTALL_ROOT")
        .env_remove("BOTCTL_REPO_URL")
        .env_remove("BOTCTL_LOG_DIR")
        .env_remove("RUST_LOG");
    for var in PROXY_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_lists_every_command() {
    let assert = botctl().arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    for command in ["deploy", "setup", "check", "start", "stop", "restart", "status", "logs"] {
        assert!(stdout.contains(command), "missing {command} in help:\n{stdout}");
    }
}

#[test]
fn invalid_config_exits_with_usage_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nformat = \"xml\"\n").unwrap();

    botctl()
        .args(["check", "--config"])
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("logging.format"));
}

#[test]
fn missing_explicit_config_exits_with_usage_code() {
    let dir = tempfile::tempdir().unwrap();

    botctl()
        .args(["status", "--config"])
        .arg(dir.path().join("absent.toml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read config file"));
}

#[test]
fn malformed_answer_is_rejected_by_the_parser() {
    botctl()
        .args(["deploy", "--answer", "restart-bot=maybe"])
        .assert()
        .code(2);
}

#[test]
fn offline_check_fails_and_leaves_a_run_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());

    botctl()
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Errors"));

    let logs: Vec<_> = std::fs::read_dir(dir.path().join("bot/logs"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert!(logs.iter().any(|name| name.starts_with("check_") && name.ends_with(".errors.log")));
    assert!(!dir.path().join("bot/venv").exists());
}

#[test]
fn json_check_ends_with_a_summary_line() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());

    let assert = botctl()
        .args(["--json", "check", "--config"])
        .arg(&config)
        .assert()
        .code(1);

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let last = stdout.lines().last().unwrap();
    let summary: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(summary["type"], "summary");
    assert_eq!(summary["payload"]["exit_code"], 1);
    assert_eq!(summary["payload"]["steps"][0]["name"], "preflight");
    assert_eq!(summary["payload"]["steps"][0]["outcome"], "failed");
}

#[test]
fn logs_without_a_service_log_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());

    botctl()
        .args(["logs", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no service log"));
}

#[test]
fn quiet_check_still_reports_the_failure_and_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(dir.path());

    botctl()
        .args(["-q", "check", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("preflight failed"))
        .stdout(predicate::str::contains("check_").and(predicate::str::contains(".log")))
        .stdout(predicate::str::contains("[1/1]").not());
}

#[test]
fn interrupt_during_a_slow_step_exits_130_with_a_summary() {
    let dir = tempfile::tempdir().unwrap();
    // Accepts the probe's connection and never answers it.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    let config = config_probing(dir.path(), &url, 30);

    let mut command = std::process::Command::new(assert_cmd::cargo::cargo_bin("botctl"));
    command
        .args(["--json", "check", "--config"])
        .arg(&config)
        .env_remove("BOTCTL_INSTALL_ROOT")
        .env_remove("BOTCTL_LOG_DIR")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for var in PROXY_VARS {
        command.env_remove(var);
    }
    let child = command.spawn().unwrap();

    let deadline = Instant::now() + Duration::from_secs(20);
    let _held = loop {
        match listener.accept() {
            Ok((stream, _)) => break stream,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                assert!(Instant::now() < deadline, "preflight never probed {url}");
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(e) => panic!("accept failed: {e}"),
        }
    };

    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    assert_eq!(rc, 0);
    let started = Instant::now();
    let output = child.wait_with_output().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(output.status.code(), Some(130));
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let summary: serde_json::Value = serde_json::from_str(stdout.lines().last().unwrap()).unwrap();
    assert_eq!(summary["type"], "summary");
    assert_eq!(summary["payload"]["interrupted"], true);
    assert_eq!(summary["payload"]["exit_code"], 130);
}
