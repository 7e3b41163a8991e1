//! Process table port.
//!
//! The service controller's state machine is platform independent; listing,
//! signalling and detached launch live behind this trait.

use crate::domain::{LaunchSpec, Signal};
use crate::error::Result;

pub trait ProcessTable: Send + Sync {
    /// PIDs of live processes whose command line contains `pattern`.
    fn find(&self, pattern: &str) -> Result<Vec<u32>>;

    fn is_alive(&self, pid: u32) -> bool;

    /// Deliver a signal. Signalling a process that already exited is not an error.
    fn signal(&self, pid: u32, signal: Signal) -> Result<()>;

    /// Launch in a new session with stdout and stderr redirected to
    /// `spec.log_path`, which is truncated first.
    fn spawn_detached(&self, spec: &LaunchSpec) -> Result<u32>;
}
