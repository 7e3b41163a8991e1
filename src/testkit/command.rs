//! Scripted subprocess runner.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::port::{CommandOutput, CommandRunner, CommandSpec};

struct Rule {
    needle: String,
    outputs: VecDeque<io::Result<CommandOutput>>,
    creates: Vec<PathBuf>,
}

/// A [`CommandRunner`] that never spawns anything.
///
/// A command matches the first rule whose needle is a substring of its
/// masked command line. Queued responses are consumed in order and the last
/// one repeats. Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for commands containing `needle`.
    pub fn respond(self, needle: &str, output: CommandOutput) -> Self {
        self.push(needle, Ok(output));
        self
    }

    /// Make commands containing `needle` fail to start.
    pub fn missing(self, needle: &str) -> Self {
        self.push(
            needle,
            Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory")),
        );
        self
    }

    /// Create an empty file at `path` whenever a matching command succeeds.
    pub fn creates_on(self, needle: &str, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        {
            let mut rules = self.rules.lock();
            match rules.iter_mut().find(|rule| rule.needle == needle) {
                Some(rule) => rule.creates.push(path),
                None => rules.push(Rule {
                    needle: needle.to_string(),
                    outputs: VecDeque::new(),
                    creates: vec![path],
                }),
            }
        }
        self
    }

    /// Masked command lines in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(CommandSpec::display).collect()
    }

    /// Recorded invocations, unmasked.
    pub fn specs(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|spec| spec.display().contains(needle))
            .count()
    }

    fn push(&self, needle: &str, output: io::Result<CommandOutput>) {
        let mut rules = self.rules.lock();
        match rules.iter_mut().find(|rule| rule.needle == needle) {
            Some(rule) => rule.outputs.push_back(output),
            None => rules.push(Rule {
                needle: needle.to_string(),
                outputs: VecDeque::from([output]),
                creates: Vec::new(),
            }),
        }
    }
}

fn clone_result(result: &io::Result<CommandOutput>) -> io::Result<CommandOutput> {
    match result {
        Ok(output) => Ok(output.clone()),
        Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        self.calls.lock().push(spec.clone());
        let line = spec.display();

        let mut rules = self.rules.lock();
        let Some(rule) = rules.iter_mut().find(|rule| line.contains(&rule.needle)) else {
            return Ok(CommandOutput::ok());
        };

        let result = match rule.outputs.len() {
            0 => Ok(CommandOutput::ok()),
            1 => clone_result(&rule.outputs[0]),
            _ => rule
                .outputs
                .pop_front()
                .unwrap_or_else(|| Ok(CommandOutput::ok())),
        };

        if matches!(result, Ok(ref output) if output.success()) {
            for path in &rule.creates {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, "")?;
            }
        }
        result
    }
}
