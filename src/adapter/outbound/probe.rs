//! Host probe: `PATH` lookup, `statvfs` and an HTTP reachability check.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::port::SystemProbe;

#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

#[async_trait]
impl SystemProbe for HostProbe {
    fn find_tool(&self, name: &str) -> Option<PathBuf> {
        if name.contains('/') {
            let path = PathBuf::from(name);
            return is_executable(&path).then_some(path);
        }
        let search = std::env::var_os("PATH")?;
        std::env::split_paths(&search)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }

    fn free_space(&self, path: &Path) -> io::Result<u64> {
        // The install root may not exist yet on a fresh host.
        let existing = path
            .ancestors()
            .find(|p| p.exists())
            .unwrap_or_else(|| Path::new("/"));
        let c_path = CString::new(existing.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        if unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) } != 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::unnecessary_cast)]
        let free = stat.f_bavail as u64 * stat.f_frsize as u64;
        Ok(free)
    }

    async fn reachable(&self, url: &str, timeout: Duration) -> bool {
        let client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                debug!(error = %e, "failed to build HTTP client");
                return false;
            }
        };
        // Any HTTP response, even an error status, proves connectivity.
        match client.head(url).send().await {
            Ok(response) => {
                debug!(url, status = %response.status(), "connectivity probe answered");
                true
            }
            Err(e) => {
                debug!(url, error = %e, "connectivity probe failed");
                false
            }
        }
    }
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_sh_on_path() {
        let found = HostProbe.find_tool("sh").unwrap();
        assert!(found.ends_with("sh"));
        assert!(HostProbe.find_tool("botctl-no-such-tool").is_none());
    }

    #[test]
    fn free_space_uses_nearest_existing_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not/yet/created");

        let free = HostProbe.free_space(&missing).unwrap();
        assert!(free > 0);
    }

    #[tokio::test]
    async fn unroutable_url_is_unreachable() {
        let reachable = HostProbe
            .reachable("http://127.0.0.1:9/", Duration::from_millis(500))
            .await;
        assert!(!reachable);
    }
}
