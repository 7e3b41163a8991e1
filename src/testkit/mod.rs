//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`command`] - [`ScriptedRunner`], a [`CommandRunner`](crate::port::CommandRunner)
//!   answering by substring match on the command line.
//! - [`process`] - [`FakeProcessTable`], an in-memory process table.
//! - [`host`] - Sleeper, probe, secret input and confirmation fakes.
//! - [`config`] - Canonical configurations rooted in a scratch directory, and
//!   the [`Fakes`] bundle that wires every fake into a toolkit.

pub mod command;
pub mod config;
pub mod host;
pub mod process;

pub use command::ScriptedRunner;
pub use config::{config_in, Fakes};
pub use host::{FakeProbe, RecordingGate, RecordingSleeper, ScriptedSecrets};
pub use process::FakeProcessTable;
