//! Host inspection port used by preflight checks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait SystemProbe: Send + Sync {
    /// Resolve an executable on `PATH`.
    fn find_tool(&self, name: &str) -> Option<PathBuf>;

    /// Free bytes on the filesystem holding `path` (or its nearest existing ancestor).
    fn free_space(&self, path: &Path) -> std::io::Result<u64>;

    /// Whether `url` answers at all within `timeout`.
    async fn reachable(&self, url: &str, timeout: Duration) -> bool;
}
