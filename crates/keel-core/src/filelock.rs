//! Advisory file locks with scoped release.
//!
//! A [`Lease`] represents exclusive ownership of a lock file for as long as
//! the value is alive. Dropping it, on any exit path, closes the file handle
//! and releases the OS advisory lock, so a held-but-unreleased lease can
//! never be observed after the acquiring scope ends.
//!
//! Locks are cross-process only in the advisory sense: they bind every
//! process that goes through [`LockManager::acquire`], and nothing else.
//! The backing file is created on first acquisition and never written to or
//! deleted; only its lock state matters.

use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use fs2::FileExt;
use thiserror::Error;

/// How a lock acquisition behaves when the resource is held elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireMode {
    /// Attempt acquisition exactly once; fail with [`LockError::Busy`] on
    /// contention.
    NonBlocking,
    /// Suspend the calling thread until the resource becomes available.
    Blocking,
}

/// Why a lock acquisition failed.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock is held by another process. Only produced by
    /// [`AcquireMode::NonBlocking`]; expected and transient.
    #[error("lock `{}` is held by another process", path.display())]
    Busy {
        /// Path of the contended lock file.
        path: PathBuf,
    },

    /// Any other OS-level failure: permission denied, uncreatable parent
    /// directory, disk errors. Never retried.
    #[error("lock `{}` is unavailable: {source}", path.display())]
    Unavailable {
        /// Path of the lock file.
        path: PathBuf,
        /// The underlying OS error.
        source: io::Error,
    },
}

/// Exclusive ownership of a lock file, released on drop.
#[derive(Debug)]
pub struct Lease {
    // Held open for the lifetime of the lease; closing it releases the lock.
    file: File,
    path: PathBuf,
}

impl Lease {
    /// Path of the locked resource.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        // The advisory lock is released when the file handle closes; unlock
        // explicitly so failures are at least visible at debug level.
        if let Err(err) = self.file.unlock() {
            tracing::debug!("failed to unlock {}: {err}", self.path.display());
        }
        tracing::debug!("released lock: {}", self.path.display());
    }
}

/// Acquires exclusive, advisory leases on lock files.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockManager {
    create_parent_dirs: bool,
}

impl LockManager {
    /// Create a manager that expects lock-file parents to already exist.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            create_parent_dirs: false,
        }
    }

    /// Create missing parent directories on acquisition.
    #[must_use]
    pub const fn with_create_parent_dirs(mut self, create: bool) -> Self {
        self.create_parent_dirs = create;
        self
    }

    /// Acquire an exclusive lease on `path`.
    ///
    /// Creates the backing file if absent. The returned [`Lease`] releases
    /// the lock when dropped, through any exit path.
    ///
    /// # Errors
    ///
    /// - [`LockError::Busy`] when `mode` is non-blocking and the lock is held
    ///   by another process
    /// - [`LockError::Unavailable`] for any other OS-level failure
    pub fn acquire(&self, path: &Path, mode: AcquireMode) -> Result<Lease, LockError> {
        if self.create_parent_dirs {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|source| LockError::Unavailable {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| LockError::Unavailable {
                path: path.to_path_buf(),
                source,
            })?;

        let locked = match mode {
            AcquireMode::NonBlocking => file.try_lock_exclusive(),
            AcquireMode::Blocking => file.lock_exclusive(),
        };

        match locked {
            Ok(()) => {
                tracing::debug!("acquired lock: {}", path.display());
                Ok(Lease {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(err)
                if mode == AcquireMode::NonBlocking
                    && err.kind() == io::ErrorKind::WouldBlock =>
            {
                Err(LockError::Busy {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(LockError::Unavailable {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, thread, time::Duration};

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn acquire_creates_file_and_release_allows_reacquisition() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.lock");
        let manager = LockManager::new();

        {
            let lease = manager.acquire(&path, AcquireMode::NonBlocking).unwrap();
            assert!(lease.path().exists());
        }

        // Released on drop, so a second acquisition succeeds.
        let lease = manager.acquire(&path, AcquireMode::NonBlocking).unwrap();
        assert_eq!(lease.path(), path);
    }

    #[test]
    fn non_blocking_contention_fails_busy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contended.lock");
        let manager = LockManager::new();

        let _held = manager.acquire(&path, AcquireMode::NonBlocking).unwrap();
        let result = manager.acquire(&path, AcquireMode::NonBlocking);

        assert!(matches!(result, Err(LockError::Busy { .. })));
    }

    #[test]
    fn missing_parent_is_unavailable_not_busy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("orphan.lock");
        let manager = LockManager::new();

        let result = manager.acquire(&path, AcquireMode::NonBlocking);

        assert!(matches!(result, Err(LockError::Unavailable { .. })));
    }

    #[test]
    fn create_parent_dirs_makes_nested_paths_acquirable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server").join("server.lock");

        let manager = LockManager::new().with_create_parent_dirs(true);
        let lease = manager.acquire(&path, AcquireMode::NonBlocking).unwrap();

        assert!(lease.path().exists());
    }

    #[test]
    fn blocking_acquire_waits_for_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blocking.lock");
        let manager = LockManager::new();

        let held = manager.acquire(&path, AcquireMode::NonBlocking).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter_path = path.clone();
        let waiter = thread::spawn(move || {
            let lease = manager
                .acquire(&waiter_path, AcquireMode::Blocking)
                .unwrap();
            tx.send(()).unwrap();
            drop(lease);
        });

        // Still held here, so the waiter must not have acquired yet.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        drop(held);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        waiter.join().unwrap();
    }
}
