//! Implementations of ports (hexagonal adapters).
//!
//! - [`inbound`] - the command-line driver
//! - [`outbound`] - subprocesses, signals, terminal prompts and host probes

pub mod inbound;
pub mod outbound;

pub use outbound::command::TokioCommandRunner;
pub use outbound::confirm::{PolicyGate, TerminalGate};
pub use outbound::probe::HostProbe;
pub use outbound::process::UnixProcessTable;
pub use outbound::secret::TerminalSecrets;
pub use outbound::sleep::TokioSleeper;
