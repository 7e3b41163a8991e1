//! Run reporter: durable log file, console echo and error/warning counters.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use serde_json::json;
use tracing::warn;

use crate::domain::{LogEntry, LogLevel};
use crate::error::Result;

/// How log calls are mirrored on the console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Echo {
    #[default]
    Human,
    Json,
    /// Human output limited to warnings, errors and the summary totals.
    Quiet,
    Silent,
}

impl Echo {
    /// Whether a line of `level` reaches the console.
    pub fn shows(self, level: LogLevel) -> bool {
        match self {
            Echo::Human | Echo::Json => true,
            Echo::Quiet => matches!(level, LogLevel::Warning | LogLevel::Error),
            Echo::Silent => false,
        }
    }
}

enum Sink {
    File {
        log: File,
        log_path: PathBuf,
        errors: Option<File>,
        errors_path: PathBuf,
    },
    Memory(Vec<LogEntry>),
}

/// Append-only run log with per-level counters.
///
/// Counters only ever grow and are only touched by the log calls.
pub struct Reporter {
    sink: Sink,
    echo: Echo,
    errors: u32,
    warnings: u32,
}

impl Reporter {
    /// Create `<log_dir>/<prefix>_<YYYYmmdd_HHMMSS>.log`. The error-only
    /// companion file is created on the first ERROR entry.
    pub fn create(
        log_dir: &Path,
        prefix: &str,
        started_at: DateTime<Local>,
        echo: Echo,
    ) -> Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        let stamp = started_at.format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("{prefix}_{stamp}.log"));
        let errors_path = log_dir.join(format!("{prefix}_{stamp}.errors.log"));
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            sink: Sink::File {
                log,
                log_path,
                errors: None,
                errors_path,
            },
            echo,
            errors: 0,
            warnings: 0,
        })
    }

    /// Keep entries in memory only; nothing is printed.
    pub fn in_memory() -> Self {
        Self {
            sink: Sink::Memory(Vec::new()),
            echo: Echo::Silent,
            errors: 0,
            warnings: 0,
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.record(LogLevel::Info, message.into());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.record(LogLevel::Success, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings += 1;
        self.record(LogLevel::Warning, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        self.record(LogLevel::Error, message.into());
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn log_path(&self) -> Option<&Path> {
        match &self.sink {
            Sink::File { log_path, .. } => Some(log_path),
            Sink::Memory(_) => None,
        }
    }

    /// Path of the error-only file, once an error has been written.
    pub fn errors_path(&self) -> Option<&Path> {
        match &self.sink {
            Sink::File {
                errors: Some(_),
                errors_path,
                ..
            } => Some(errors_path),
            _ => None,
        }
    }

    /// Entries kept by an in-memory reporter; empty for file-backed ones.
    pub fn entries(&self) -> &[LogEntry] {
        match &self.sink {
            Sink::Memory(entries) => entries.as_slice(),
            Sink::File { .. } => &[],
        }
    }

    pub(crate) fn echo(&self) -> Echo {
        self.echo
    }

    /// Write an INFO line without printing it (used for the summary block).
    pub(crate) fn append_quiet(&mut self, message: impl Into<String>) {
        let entry = LogEntry::new(LogLevel::Info, message);
        self.append(&entry);
    }

    fn record(&mut self, level: LogLevel, message: String) {
        let entry = LogEntry::new(level, message);
        self.print(&entry);
        self.append(&entry);
    }

    fn append(&mut self, entry: &LogEntry) {
        match &mut self.sink {
            Sink::Memory(entries) => entries.push(entry.clone()),
            Sink::File {
                log,
                log_path,
                errors,
                errors_path,
            } => {
                let line = format!("{}\n", entry.render());
                if let Err(e) = log.write_all(line.as_bytes()) {
                    warn!(error = %e, path = %log_path.display(), "failed to append to run log");
                }
                if entry.level == LogLevel::Error {
                    if errors.is_none() {
                        match OpenOptions::new().create(true).append(true).open(&*errors_path) {
                            Ok(file) => *errors = Some(file),
                            Err(e) => {
                                warn!(error = %e, path = %errors_path.display(), "failed to open error log");
                            }
                        }
                    }
                    if let Some(file) = errors {
                        if let Err(e) = file.write_all(line.as_bytes()) {
                            warn!(error = %e, "failed to append to error log");
                        }
                    }
                }
            }
        }
    }

    fn print(&self, entry: &LogEntry) {
        if !self.echo.shows(entry.level) {
            return;
        }
        match self.echo {
            Echo::Silent => {}
            Echo::Json => {
                println!(
                    "{}",
                    json!({
                        "type": "log",
                        "payload": entry,
                    })
                );
            }
            Echo::Human | Echo::Quiet => match entry.level {
                LogLevel::Info => println!("  {} {}", "›".dimmed(), entry.message),
                LogLevel::Success => println!("  {} {}", "✓".green(), entry.message),
                LogLevel::Warning => println!("  {} {}", "⚠".yellow(), entry.message),
                LogLevel::Error => eprintln!("  {} {}", "×".red(), entry.message),
            },
        }
    }
}
