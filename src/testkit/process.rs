//! In-memory process table.

use std::collections::BTreeMap;
use std::io::Write;

use parking_lot::Mutex;

use crate::domain::{LaunchSpec, Signal};
use crate::error::Result;
use crate::port::ProcessTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resistance {
    None,
    /// Ignores SIGTERM, dies on SIGKILL.
    Term,
    /// Survives everything.
    All,
}

struct FakeProcess {
    command_line: String,
    alive: bool,
    resistance: Resistance,
}

struct State {
    next_pid: u32,
    processes: BTreeMap<u32, FakeProcess>,
    launches: Vec<LaunchSpec>,
    signals: Vec<(u32, Signal)>,
    crash_next_start: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_pid: 4000,
            processes: BTreeMap::new(),
            launches: Vec::new(),
            signals: Vec::new(),
            crash_next_start: false,
        }
    }
}

/// A [`ProcessTable`] backed by a map of fake processes.
///
/// Launches write one line to the redirect log so tests can tell which
/// process produced it.
#[derive(Default)]
pub struct FakeProcessTable {
    state: Mutex<State>,
}

impl FakeProcessTable {
    pub fn insert_running(&self, command_line: &str) -> u32 {
        self.insert(command_line, Resistance::None)
    }

    pub fn insert_stubborn(&self, command_line: &str) -> u32 {
        self.insert(command_line, Resistance::Term)
    }

    pub fn insert_unkillable(&self, command_line: &str) -> u32 {
        self.insert(command_line, Resistance::All)
    }

    /// The next launched process exits before the settle check.
    pub fn crash_next_start(&self) {
        self.state.lock().crash_next_start = true;
    }

    pub fn live_matching(&self, pattern: &str) -> Vec<u32> {
        self.state
            .lock()
            .processes
            .iter()
            .filter(|(_, p)| p.alive && p.command_line.contains(pattern))
            .map(|(pid, _)| *pid)
            .collect()
    }

    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.state.lock().launches.clone()
    }

    pub fn signals(&self) -> Vec<(u32, Signal)> {
        self.state.lock().signals.clone()
    }

    fn insert(&self, command_line: &str, resistance: Resistance) -> u32 {
        let mut state = self.state.lock();
        let pid = state.next_pid;
        state.next_pid += 1;
        state.processes.insert(
            pid,
            FakeProcess {
                command_line: command_line.to_string(),
                alive: true,
                resistance,
            },
        );
        pid
    }
}

impl ProcessTable for FakeProcessTable {
    fn find(&self, pattern: &str) -> Result<Vec<u32>> {
        Ok(self.live_matching(pattern))
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.state
            .lock()
            .processes
            .get(&pid)
            .is_some_and(|p| p.alive)
    }

    fn signal(&self, pid: u32, signal: Signal) -> Result<()> {
        let mut state = self.state.lock();
        state.signals.push((pid, signal));
        if let Some(process) = state.processes.get_mut(&pid) {
            let dies = match (signal, process.resistance) {
                (_, Resistance::All) => false,
                (Signal::Terminate, Resistance::Term) => false,
                _ => true,
            };
            if dies {
                process.alive = false;
            }
        }
        Ok(())
    }

    fn spawn_detached(&self, spec: &LaunchSpec) -> Result<u32> {
        let mut state = self.state.lock();
        let pid = state.next_pid;
        state.next_pid += 1;
        let alive = !std::mem::take(&mut state.crash_next_start);
        state.processes.insert(
            pid,
            FakeProcess {
                command_line: spec.command_line(),
                alive,
                resistance: Resistance::None,
            },
        );
        state.launches.push(spec.clone());
        drop(state);

        let mut log = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&spec.log_path)?;
        writeln!(log, "pid {pid} started")?;
        Ok(pid)
    }
}
