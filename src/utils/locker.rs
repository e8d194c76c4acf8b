//! File-based advisory locks with a bounded wait

use crate::error::{ControlError, Result};
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often a contended lock is retried
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Exclusive lock on a named key, released on drop
pub struct FileLock {
    // The guard borrows the RwLock stored in the same Box
    lock: Box<(RwLock<File>, Option<fd_lock::RwLockWriteGuard<'static, File>>)>,
    lock_path: PathBuf,
    key: String,
}

impl FileLock {
    /// Acquire an exclusive lock for `key` under `lock_dir`
    ///
    /// Polls until the lock is free or `timeout` has elapsed, in which case
    /// `ControlError::LockTimeout` is returned.
    pub fn acquire(lock_dir: &Path, key: &str, timeout: Duration) -> Result<Self> {
        let lock_path = Self::lock_path(lock_dir, key);

        debug!("Attempting to acquire lock '{}': {:?}", key, lock_path);

        std::fs::create_dir_all(lock_dir).map_err(|e| {
            ControlError::Unavailable(format!(
                "failed to create lock directory {:?}: {}",
                lock_dir, e
            ))
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| {
                ControlError::Unavailable(format!(
                    "failed to open lock file {:?}: {}",
                    lock_path, e
                ))
            })?;

        let mut boxed_lock = Box::new((RwLock::new(file), None));
        let lock_ptr = &mut boxed_lock.0 as *mut RwLock<File>;
        let started = Instant::now();

        loop {
            // SAFETY: the RwLock lives in a Box that is never moved out of
            // `FileLock`, and `Drop` releases the guard before the RwLock.
            match unsafe { (*lock_ptr).try_write() } {
                Ok(guard) => {
                    let static_guard: fd_lock::RwLockWriteGuard<'static, File> =
                        unsafe { std::mem::transmute(guard) };
                    boxed_lock.1 = Some(static_guard);
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        warn!("Timed out waiting for lock '{}' after {:?}", key, waited);
                        return Err(ControlError::LockTimeout {
                            key: key.to_string(),
                            waited,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL.min(timeout - waited));
                }
                Err(e) => {
                    return Err(ControlError::Unavailable(format!(
                        "failed to lock {:?}: {}",
                        lock_path, e
                    )));
                }
            }
        }

        debug!(
            "Acquired lock '{}' after {:?}",
            key,
            started.elapsed()
        );

        Ok(Self {
            lock: boxed_lock,
            lock_path,
            key: key.to_string(),
        })
    }

    /// Map a lock key such as `/cred/lock` to a file under `lock_dir`
    fn lock_path(lock_dir: &Path, key: &str) -> PathBuf {
        let name: String = key
            .trim_start_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        lock_dir.join(format!("{}.lock", name))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the lock file path (for inspection)
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Guard first: it still points into the RwLock
        self.lock.1.take();
        debug!("Released lock '{}'", self.key);
        // The lock file stays; unlinking it would let a waiter lock a stale inode.
    }
}
