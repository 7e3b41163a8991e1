//! Fakes for the host-facing ports: sleeping, probing, secrets, confirmation.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::adapter::PolicyGate;
use crate::domain::{Decision, Prompt};
use crate::error::Result;
use crate::port::{ConfirmationGate, SecretInput, Sleeper, SystemProbe};

// ---------------------------------------------------------------------------
// RecordingSleeper
// ---------------------------------------------------------------------------

/// Returns immediately and remembers every requested duration.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}

// ---------------------------------------------------------------------------
// FakeProbe
// ---------------------------------------------------------------------------

/// A host with every tool installed, plenty of disk and working network,
/// unless told otherwise.
#[derive(Debug, Clone)]
pub struct FakeProbe {
    missing_tools: HashSet<String>,
    free_bytes: u64,
    online: bool,
}

impl Default for FakeProbe {
    fn default() -> Self {
        Self {
            missing_tools: HashSet::new(),
            free_bytes: 100 * 1024 * 1024 * 1024,
            online: true,
        }
    }
}

impl FakeProbe {
    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    pub fn without_tool(mut self, name: &str) -> Self {
        self.missing_tools.insert(name.to_string());
        self
    }

    pub fn with_free_space(mut self, bytes: u64) -> Self {
        self.free_bytes = bytes;
        self
    }
}

#[async_trait]
impl SystemProbe for FakeProbe {
    fn find_tool(&self, name: &str) -> Option<PathBuf> {
        if self.missing_tools.contains(name) {
            None
        } else {
            Some(Path::new("/usr/bin").join(name))
        }
    }

    fn free_space(&self, _path: &Path) -> std::io::Result<u64> {
        Ok(self.free_bytes)
    }

    async fn reachable(&self, _url: &str, _timeout: Duration) -> bool {
        self.online
    }
}

// ---------------------------------------------------------------------------
// ScriptedSecrets
// ---------------------------------------------------------------------------

/// Hands out queued secrets; errors once the queue is empty.
#[derive(Default)]
pub struct ScriptedSecrets {
    queue: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedSecrets {
    pub fn with(secrets: &[&str]) -> Self {
        Self {
            queue: Mutex::new(secrets.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl SecretInput for ScriptedSecrets {
    async fn read_secret(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.queue.lock().pop_front().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no scripted secret").into()
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingGate
// ---------------------------------------------------------------------------

/// A [`PolicyGate`] that remembers which prompts were asked.
pub struct RecordingGate {
    policy: PolicyGate,
    asked: Mutex<Vec<String>>,
}

impl RecordingGate {
    pub fn new(policy: PolicyGate) -> Self {
        Self {
            policy,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }
}

impl Default for RecordingGate {
    fn default() -> Self {
        Self::new(PolicyGate::reject_all())
    }
}

#[async_trait]
impl ConfirmationGate for RecordingGate {
    async fn confirm(&self, prompt: &Prompt) -> Result<Decision> {
        self.asked.lock().push(prompt.id.clone());
        self.policy.confirm(prompt).await
    }
}
