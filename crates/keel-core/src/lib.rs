//! # Keel Core
//!
//! Core functionality for Keel: coordinating the startup of a single
//! analysis server per project directory.
//!
//! The interesting piece is the double-lock startup protocol in
//! [`coordinator`], built on the advisory file leases in [`filelock`].
//! Everything else — configuration, launch-request assembly, the state-file
//! layout — is the plumbing around it.
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, Error>`. Use:
//! - `?` operator for propagation
//! - `match` on specific variants where behavior depends on the failure kind

pub mod config;
pub mod coordinator;
mod error;
pub mod filelock;
pub mod launch;
pub mod paths;

pub use config::{load_config, Config};
pub use coordinator::{
    CoordinationOutcome, StartCoordinator, StartObserver, TracingObserver, WaitPolicy,
};
pub use error::{Error, Result};
pub use filelock::{AcquireMode, Lease, LockError, LockManager};
pub use launch::{BinaryLauncher, ServerLauncher, StartOptions, StartRequest};
pub use paths::StateLayout;
