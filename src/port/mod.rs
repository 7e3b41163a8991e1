//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Steps and the application services reach the outside world only through
//! these traits, so the whole pipeline can run against in-memory fakes.
//!
//! # Available Ports
//!
//! - [`CommandRunner`] - Subprocess execution (git, pip, modal)
//! - [`ConfirmationGate`] - Operator yes/no decisions
//! - [`ProcessTable`] - Process discovery, signals and detached launch
//! - [`Sleeper`] - Backoff, grace and settle waits
//! - [`SystemProbe`] - Tool lookup, disk space and connectivity
//! - [`SecretInput`] - Hidden credential entry

mod command;
mod confirm;
mod probe;
mod process;
mod secret;
mod sleep;

pub use command::{run_checked, CommandOutput, CommandRunner, CommandSpec};
pub use confirm::ConfirmationGate;
pub use probe::SystemProbe;
pub use process::ProcessTable;
pub use secret::SecretInput;
pub use sleep::Sleeper;
