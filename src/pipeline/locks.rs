//! Per-path locks so concurrent requests for the same output or source file
//! wait for one another instead of duplicating downloads and remuxes.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of cache path to the lock guarding its production.
#[derive(Clone, Default)]
pub struct PathLocks {
    inner: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `path`.
    pub async fn acquire(&self, path: &Path) -> PathGuard {
        let lock = self
            .inner
            .entry(path.to_path_buf())
            .or_default()
            .value()
            .clone();

        let guard = lock.lock_owned().await;
        PathGuard {
            locks: self.clone(),
            path: path.to_path_buf(),
            guard: Some(guard),
        }
    }

    /// Number of paths currently locked or awaited.
    pub fn in_flight(&self) -> usize {
        self.inner.len()
    }
}

/// Releases the path on drop and forgets it once nobody else is waiting.
pub struct PathGuard {
    locks: PathLocks,
    path: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map holds a reference once no task owns or awaits the lock.
        self.locks
            .inner
            .remove_if(&self.path, |_, lock| Arc::strong_count(lock) == 1);
    }
}
