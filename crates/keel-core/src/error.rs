//! Error types for Keel with exit-code mapping:
//!
//! - **Configuration errors**: invalid or unparseable configuration (exit code 1)
//! - **Lock errors**: OS-level lock failures, never simple contention (exit code 2)
//! - **Launch errors**: spawn failures and nonzero server exits (exit code 3)
//!
//! Lock *contention* is not represented here: `filelock::LockError::Busy` is
//! handled inside the coordinator and never escapes as a hard failure.

use std::{io, process::ExitStatus};

use thiserror::Error;

use crate::filelock::LockError;

/// Top-level error type for all Keel operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unparseable configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A lock file could not be acquired for reasons other than contention.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The server binary could not be spawned at all.
    #[error("failed to launch `{command}`: {source}")]
    LaunchSpawn {
        /// The command that failed to spawn.
        command: String,
        /// The underlying OS error.
        source: io::Error,
    },

    /// The server binary ran but reported failure.
    #[error("server launcher `{command}` exited with {status}: {stderr}")]
    LaunchFailed {
        /// The command that was invoked.
        command: String,
        /// The exit status reported by the launcher.
        status: ExitStatus,
        /// Captured stderr, trimmed.
        stderr: String,
    },

    /// A background lock wait ended before completing.
    #[error("lock wait interrupted: {0}")]
    Interrupted(String),

    /// Any other IO failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Map this error to a process exit code.
    ///
    /// Configuration problems exit 1, lock failures exit 2, launch and IO
    /// failures exit 3.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,
            Self::Lock(_) => 2,
            Self::LaunchSpawn { .. } | Self::LaunchFailed { .. } | Self::Interrupted(_) | Self::Io(_) => 3,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        let config = Error::Config("workers must be at least 1".to_string());
        assert_eq!(config.exit_code(), 1);

        let lock = Error::Lock(LockError::Unavailable {
            path: "/nonexistent/dir/client.lock".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        });
        assert_eq!(lock.exit_code(), 2);

        let interrupted = Error::Interrupted("runtime shut down".to_string());
        assert_eq!(interrupted.exit_code(), 3);
    }
}
