//! Confirmation gates: a terminal prompt and a pre-set answer policy.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;

use async_trait::async_trait;
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use tracing::debug;

use crate::domain::{AutoAnswer, Decision, Prompt};
use crate::error::Result;
use crate::infrastructure::config::settings::ConfirmConfig;
use crate::port::ConfirmationGate;

/// Whether a typed answer means yes. Only a leading `y`/`Y` does.
pub fn parse_answer(line: &str) -> bool {
    line.trim_start().starts_with(['y', 'Y'])
}

type Input = Arc<Mutex<Box<dyn BufRead + Send>>>;
type Output = Arc<Mutex<Box<dyn Write + Send>>>;

/// Asks on a terminal and reads one line.
///
/// The prompt is written and the answer read on the blocking pool, so the
/// runtime keeps polling (and can react to Ctrl-C) while the operator types.
pub struct TerminalGate {
    input: Input,
    output: Output,
}

impl TerminalGate {
    /// Prompt on stderr, read from stdin.
    pub fn stdio() -> Self {
        Self::with_io(BufReader::new(io::stdin()), io::stderr())
    }

    pub fn with_io(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            input: Arc::new(Mutex::new(Box::new(input))),
            output: Arc::new(Mutex::new(Box::new(output))),
        }
    }
}

fn ask(input: &Input, output: &Output, text: &str) -> io::Result<String> {
    {
        let mut output = output.lock();
        write!(output, "  {} {} {} ", "?".cyan(), text.bold(), "[y/N]".dimmed())?;
        output.flush()?;
    }

    let mut line = String::new();
    // Zero bytes read is EOF, which parses as "no".
    input.lock().read_line(&mut line)?;
    Ok(line)
}

#[async_trait]
impl ConfirmationGate for TerminalGate {
    async fn confirm(&self, prompt: &Prompt) -> Result<Decision> {
        let input = Arc::clone(&self.input);
        let output = Arc::clone(&self.output);
        let text = prompt.text.clone();

        let line = tokio::task::spawn_blocking(move || ask(&input, &output, &text))
            .await
            .map_err(io::Error::other)??;

        Ok(if parse_answer(&line) {
            Decision::accept(prompt)
        } else {
            Decision::reject(prompt)
        })
    }
}

/// Answers from a per-prompt map, then an optional fallback gate, then a
/// global default. Never blocks unless the fallback does.
pub struct PolicyGate {
    answers: HashMap<String, bool>,
    default: AutoAnswer,
    fallback: Option<Arc<dyn ConfirmationGate>>,
}

impl PolicyGate {
    pub fn new(default: AutoAnswer) -> Self {
        Self {
            answers: HashMap::new(),
            default,
            fallback: None,
        }
    }

    pub fn accept_all() -> Self {
        Self::new(AutoAnswer::Accept)
    }

    pub fn reject_all() -> Self {
        Self::new(AutoAnswer::Reject)
    }

    pub fn from_config(config: &ConfirmConfig) -> Self {
        Self {
            answers: config.answers.clone(),
            default: config.default,
            fallback: None,
        }
    }

    pub fn with_answer(mut self, prompt_id: impl Into<String>, accept: bool) -> Self {
        self.answers.insert(prompt_id.into(), accept);
        self
    }

    pub fn with_default(mut self, default: AutoAnswer) -> Self {
        self.default = default;
        self
    }

    /// Ask `gate` for prompts that have no explicit answer instead of
    /// using the default.
    pub fn with_fallback(mut self, gate: Arc<dyn ConfirmationGate>) -> Self {
        self.fallback = Some(gate);
        self
    }
}

#[async_trait]
impl ConfirmationGate for PolicyGate {
    async fn confirm(&self, prompt: &Prompt) -> Result<Decision> {
        let accepted = match self.answers.get(&prompt.id) {
            Some(&accepted) => accepted,
            None => match self.fallback {
                Some(ref gate) => return gate.confirm(prompt).await,
                None => self.default.accepts(),
            },
        };
        debug!(prompt = %prompt.id, accepted, "answered from policy");
        Ok(Decision {
            prompt_id: prompt.id.clone(),
            accepted,
        })
    }
}
