//! Inter-process advisory mutex keyed by an arbitrary path.
//!
//! Exclusive creation of the lock file is the ownership proof: the
//! filesystem is the coordination medium, not any in-process state. Stale
//! locks (dead PID or aged past the threshold) are reclaimed by unlinking
//! and retrying, itself serialized by the same exclusive-create.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::error::{Error, LockError, Result};

/// Contents of a lock file: the claim the filesystem represents.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockContents {
    pid: u32,
    created_time: i64,
}

/// Tunable knobs for [`acquire`].
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// How long to wait for contention to clear before giving up.
    pub max_wait: Duration,
    /// Delay between contended retries.
    pub retry_interval: Duration,
    /// Age past which a lock file is considered stale regardless of PID
    /// liveness.
    pub stale_after: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(crate::config::DEFAULT_MAX_WAIT_SECS),
            retry_interval: Duration::from_millis(crate::config::RETRY_INTERVAL_MS),
            stale_after: Duration::from_secs(crate::config::STALE_LOCK_SECONDS),
        }
    }
}

/// An acquired lock; releases on drop if [`release`] was not already
/// called, best-effort (drop cannot report I/O errors, so failures there
/// are only logged).
#[derive(Debug)]
pub struct LockGuard {
    lock_path: PathBuf,
    pid: u32,
    released: bool,
}

impl LockGuard {
    /// Path guarded by this lock.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = release_sync(&self.lock_path, self.pid) {
            tracing::warn!(path = %self.lock_path.display(), error = %e, "failed to release lock on drop");
        }
    }
}

/// Acquire an exclusive lock guarding `path`.
pub async fn acquire(path: &Path, options: LockOptions) -> Result<LockGuard> {
    let lock_path = crate::path_resolver::lock_path(path);
    let pid = std::process::id();
    let deadline = tokio::time::Instant::now() + options.max_wait;

    loop {
        match try_create(&lock_path, pid).await {
            Ok(()) => {
                tracing::debug!(path = %lock_path.display(), pid, "acquired lock");
                return Ok(LockGuard {
                    lock_path,
                    pid,
                    released: false,
                });
            }
            Err(Error::Filesystem(_, _)) | Err(Error::Internal(_)) => {
                // Collision: inspect the existing file for staleness.
                if is_stale(&lock_path, options.stale_after).await {
                    tracing::info!(path = %lock_path.display(), "reclaiming stale lock");
                    let _ = tokio::fs::remove_file(&lock_path).await;
                    continue;
                }
                if tokio::time::Instant::now() >= deadline {
                    return Err(Error::Lock(LockError::Timeout(lock_path)));
                }
                sleep(options.retry_interval).await;
            }
            Err(other) => return Err(other),
        }
    }
}

/// Release `guard`. Idempotent; a no-op if already released or if the
/// lock's recorded PID no longer matches ours (stolen by a reclaimer).
pub async fn release(mut guard: LockGuard) -> Result<()> {
    release_sync(&guard.lock_path, guard.pid)?;
    guard.released = true;
    Ok(())
}

fn release_sync(lock_path: &Path, pid: u32) -> Result<()> {
    let Ok(raw) = std::fs::read_to_string(lock_path) else {
        // Already gone: release is idempotent.
        return Ok(());
    };
    let Ok(contents) = serde_json::from_str::<LockContents>(&raw) else {
        // Unreadable contents: treat as already reclaimed, not our problem.
        return Ok(());
    };
    if contents.pid != pid {
        // Our lock was stolen after we went stale. The violated invariant
        // was our own liveness, not correctness; this is still success.
        return Ok(());
    }
    match std::fs::remove_file(lock_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Filesystem(lock_path.to_path_buf(), e.to_string())),
    }
}

async fn try_create(lock_path: &Path, pid: u32) -> Result<()> {
    if let Some(parent) = lock_path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::Filesystem(parent.to_path_buf(), e.to_string())
        })?;
    }
    let contents = LockContents {
        pid,
        created_time: now_secs(),
    };
    let body = serde_json::to_vec(&contents)?;

    let mut opts = tokio::fs::OpenOptions::new();
    opts.write(true).create_new(true);
    match opts.open(lock_path).await {
        Ok(mut file) => {
            use tokio::io::AsyncWriteExt;
            file.write_all(&body).await.map_err(|e| {
                Error::Filesystem(lock_path.to_path_buf(), e.to_string())
            })?;
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(Error::Filesystem(lock_path.to_path_buf(), e.to_string()))
        }
        Err(e) => Err(Error::Filesystem(lock_path.to_path_buf(), e.to_string())),
    }
}

async fn is_stale(lock_path: &Path, stale_after: Duration) -> bool {
    let Ok(metadata) = tokio::fs::metadata(lock_path).await else {
        // Vanished between the collision and this check: treat as
        // reclaimable, the next `try_create` will race fairly.
        return true;
    };
    let age_stale = metadata
        .modified()
        .ok()
        .and_then(|m| m.elapsed().ok())
        .map_or(true, |elapsed| elapsed > stale_after);
    if age_stale {
        return true;
    }
    let Ok(raw) = tokio::fs::read_to_string(lock_path).await else {
        return true;
    };
    let Ok(contents) = serde_json::from_str::<LockContents>(&raw) else {
        return true;
    };
    !pid_is_live(contents.pid)
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(target_os = "linux")]
fn pid_is_live(pid: u32) -> bool {
    // `/proc/<pid>` exists for exactly as long as the process does; no FFI
    // required, unlike a `kill(pid, 0)` probe.
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_is_live(_pid: u32) -> bool {
    // No portable liveness probe: rely solely on the staleness window.
    true
}
