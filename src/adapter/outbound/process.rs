//! Unix process table: `pgrep -f` discovery, `kill(2)` signals and
//! `setsid` detached launch.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::domain::{LaunchSpec, Signal};
use crate::error::Result;
use crate::port::ProcessTable;

#[derive(Debug, Clone, Copy, Default)]
pub struct UnixProcessTable;

impl ProcessTable for UnixProcessTable {
    fn find(&self, pattern: &str) -> Result<Vec<u32>> {
        let output = Command::new("pgrep")
            .arg("-f")
            .arg(escape_pattern(pattern))
            .stdin(Stdio::null())
            .output()?;

        // pgrep exits 1 when nothing matched.
        match output.status.code() {
            Some(0) | Some(1) => {}
            _ => {
                return Err(io::Error::other(format!(
                    "pgrep failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ))
                .into())
            }
        }

        let own = std::process::id();
        let pids = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.trim().parse::<u32>().ok())
            .filter(|&pid| pid != own && self.is_alive(pid))
            .collect();
        Ok(pids)
    }

    fn is_alive(&self, pid: u32) -> bool {
        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };

        // A child of ours that exited stays a zombie until reaped, and a
        // zombie still answers kill(pid, 0).
        let mut status = 0;
        let reaped = unsafe { libc::waitpid(raw, &mut status, libc::WNOHANG) };
        if reaped == raw {
            return false;
        }

        if unsafe { libc::kill(raw, 0) } == 0 {
            return true;
        }
        io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }

    fn signal(&self, pid: u32, signal: Signal) -> Result<()> {
        let raw = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("bad pid {pid}")))?;
        let signo = match signal {
            Signal::Terminate => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        };

        debug!(pid, ?signal, "signalling");
        if unsafe { libc::kill(raw, signo) } == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        Err(err.into())
    }

    fn spawn_detached(&self, spec: &LaunchSpec) -> Result<u32> {
        let log = open_truncated(spec)?;
        let stderr = log.try_clone()?;

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(stderr);

        // New session: no controlling terminal, so Ctrl-C in the operator's
        // shell does not reach the service.
        unsafe {
            command.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = command.spawn()?;
        let pid = child.id();
        debug!(pid, command = %spec.command_line(), log = %spec.log_path.display(), "launched");
        // Dropping a std Child neither kills nor waits on it.
        drop(child);
        Ok(pid)
    }
}

fn open_truncated(spec: &LaunchSpec) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&spec.log_path)
        .map_err(|e| {
            warn!(error = %e, path = %spec.log_path.display(), "cannot open service log");
            e
        })
}

/// `pgrep` takes an extended regex; match the name literally.
fn escape_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    #[test]
    fn escapes_regex_metacharacters() {
        assert_eq!(escape_pattern("discord_logo_bot.py"), "discord_logo_bot\\.py");
        assert_eq!(escape_pattern("a+b"), "a\\+b");
    }

    #[test]
    fn own_process_is_alive_and_bogus_pid_is_not() {
        let table = UnixProcessTable;
        assert!(table.is_alive(std::process::id()));
        assert!(!table.is_alive(u32::MAX));
    }

    #[test]
    fn signalling_a_gone_process_is_ok() {
        let table = UnixProcessTable;
        let child = Command::new("true").spawn().unwrap();
        let pid = child.id();
        let _ = child.wait_with_output();

        assert!(table.signal(pid, Signal::Terminate).is_ok());
    }

    #[test]
    fn spawned_process_logs_and_dies_on_kill() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("bot.log");
        std::fs::write(&log_path, "stale output\n").unwrap();
        let spec = LaunchSpec {
            display_name: "sleep".to_string(),
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), "echo started; exec sleep 30".to_string()],
            cwd: dir.path().to_path_buf(),
            env: Vec::new(),
            log_path: log_path.clone(),
        };

        let table = UnixProcessTable;
        let pid = table.spawn_detached(&spec).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        assert!(table.is_alive(pid));

        table.signal(pid, Signal::Kill).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(!table.is_alive(pid));

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(log, "started\n");
    }
}
