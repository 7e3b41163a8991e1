//! botctl - provisioning and redeployment for the logo bot.
//!
//! Brings a host from nothing to a running Discord bot backed by a Modal
//! inference app, and is safe to re-run: every step checks whether its work
//! is already done before acting.
//!
//! # Architecture
//!
//! The crate follows a ports-and-adapters layout:
//!
//! - [`domain`] - Step outcomes, retry policy, prompts, process and migration types
//! - [`port`] - Traits for everything that touches the host (subprocesses,
//!   processes, terminal, clock, probes)
//! - [`application`] - The step orchestrator, retry executor, environment
//!   builder, service controller and the concrete pipeline steps
//! - [`adapter`] - Real port implementations and the CLI
//! - [`infrastructure`] - Configuration, credentials and logging setup
//! - [`error`] - Error types for the crate
//!
//! # Pipelines
//!
//! `deploy` (the default) runs preflight, repository sync, credentials,
//! environment, dependencies, the Modal lookup migration, Modal auth, the
//! inference deploy and a bot restart. `setup` stops after Modal auth;
//! `check` runs preflight only.
//!
//! # Example
//!
//! ```no_run
//! use botctl::application::pipeline::{build, PipelineKind};
//! use botctl::infrastructure::config::Config;
//!
//! # fn toolkit() -> botctl::application::Toolkit { unimplemented!() }
//! let config = Config::load_or_default("config.toml").unwrap();
//! let pipeline = build(PipelineKind::Check, &config, &toolkit()).unwrap();
//! assert_eq!(pipeline.step_names(), vec!["preflight"]);
//! ```

#[cfg(not(unix))]
compile_error!("botctl manages Unix processes and only builds on Unix targets");

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
