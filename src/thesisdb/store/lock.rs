//! Sidecar lock markers.
//!
//! A resource `students.json` is locked by exclusively creating
//! `students.json.lock`. The marker holds the creation time and the owner's pid;
//! staleness is judged from the marker's mtime, so a crashed holder is recovered
//! from once the marker is older than the configured threshold.
//!
//! Locks are not reentrant: acquiring the same resource twice from one thread
//! without releasing in between waits on yourself until the timeout.

use crate::error::{Result, StoreError};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const LOCK_SUFFIX: &str = ".lock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    pub timeout: Duration,
    pub stale_after: Duration,
    pub poll_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            stale_after: Duration::from_secs(60),
            poll_interval: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Free,
    Held { age: Duration },
    Stale { age: Duration },
}

/// Path of the lock marker guarding `resource`.
pub fn lock_path(resource: &Path) -> PathBuf {
    let mut name = resource
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(LOCK_SUFFIX);
    resource.with_file_name(name)
}

/// Holds a resource lock until released or dropped.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the marker. A marker that is already gone is not an error.
    pub fn release(mut self) {
        self.remove_marker();
    }

    fn remove_marker(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(lock = %self.path.display(), "lock released"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(lock = %self.path.display(), error = %e, "failed to remove lock marker"),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.remove_marker();
    }
}

/// Acquire the lock for `resource`, polling until `opts.timeout` elapses.
pub fn acquire(resource: &Path, opts: &LockOptions) -> Result<LockGuard> {
    let path = lock_path(resource);
    let started = Instant::now();

    loop {
        let mut retry_now = false;
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let stamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs_f64();
                // The marker body is informational; staleness uses mtime.
                if let Err(e) = write!(file, "{:.6} {}", stamp, std::process::id()) {
                    debug!(lock = %path.display(), error = %e, "could not write lock marker body");
                }
                debug!(lock = %path.display(), "lock acquired");
                return Ok(LockGuard {
                    path,
                    released: false,
                });
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => match marker_age(&path) {
                Some(age) if age > opts.stale_after => {
                    warn!(
                        lock = %path.display(),
                        age_secs = age.as_secs_f64(),
                        "seizing stale lock"
                    );
                    match fs::remove_file(&path) {
                        Ok(()) => continue,
                        Err(e) if e.kind() == ErrorKind::NotFound => continue,
                        Err(e) => return Err(StoreError::Io(e)),
                    }
                }
                Some(_) => {}
                // Marker vanished between create and stat: retry right away.
                None => retry_now = true,
            },
            Err(e) => return Err(StoreError::Io(e)),
        }

        let waited = started.elapsed();
        if waited > opts.timeout {
            return Err(StoreError::LockTimeout {
                resource: resource.to_path_buf(),
                waited,
            });
        }
        if !retry_now {
            std::thread::sleep(opts.poll_interval);
        }
    }
}

/// Inspect the lock marker for `resource` without touching it.
pub fn lock_state(resource: &Path, stale_after: Duration) -> LockState {
    match marker_age(&lock_path(resource)) {
        None => LockState::Free,
        Some(age) if age > stale_after => LockState::Stale { age },
        Some(age) => LockState::Held { age },
    }
}

fn marker_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    // A marker from the future (clock skew) counts as brand new.
    Some(SystemTime::now().duration_since(modified).unwrap_or_default())
}
