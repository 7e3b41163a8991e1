//! Canonical test configurations and the fake toolkit.
//!
//! Single source of truth for the config used across tests, so each test
//! module does not define its own slightly different install root.

use std::path::Path;
use std::sync::Arc;

use super::command::ScriptedRunner;
use super::host::{FakeProbe, RecordingGate, RecordingSleeper, ScriptedSecrets};
use super::process::FakeProcessTable;
use crate::application::Toolkit;
use crate::infrastructure::config::Config;

/// Defaults rooted in `root`, with the Modal token file kept inside it and
/// a small disk requirement.
pub fn config_in(root: &Path) -> Config {
    let mut config = Config::default();
    config.paths.install_root = root.to_path_buf();
    config.modal.token_file = Some(root.join(".modal.toml"));
    config.preflight.min_free_mb = 1;
    config
}

/// Every fake port, shared so tests can inspect them after a run.
#[derive(Clone, Default)]
pub struct Fakes {
    pub runner: Arc<ScriptedRunner>,
    pub sleeper: Arc<RecordingSleeper>,
    pub probe: Arc<FakeProbe>,
    pub processes: Arc<FakeProcessTable>,
    pub gate: Arc<RecordingGate>,
    pub secrets: Arc<ScriptedSecrets>,
}

impl Fakes {
    pub fn toolkit(&self) -> Toolkit {
        Toolkit {
            runner: self.runner.clone(),
            sleeper: self.sleeper.clone(),
            probe: self.probe.clone(),
            processes: self.processes.clone(),
            gate: self.gate.clone(),
            secrets: self.secrets.clone(),
        }
    }
}
