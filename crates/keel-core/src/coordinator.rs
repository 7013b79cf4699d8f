//! Singleton server-startup coordination.
//!
//! At most one analysis server may be active per project directory, even
//! when multiple launcher invocations race to start one. Two advisory locks
//! enforce this:
//!
//! - the **start lock** serializes concurrent start attempts, so two
//!   simultaneous invocations never both probe-and-launch;
//! - the **server lock** is held by a running server for its lifetime. The
//!   coordinator probes it non-blockingly under the start lock, which is
//!   race-free: no other start attempt can be mid-probe concurrently.
//!
//! A successful probe is released immediately; the coordinator never holds
//! the server lock past the liveness check.

use std::{
    path::Path,
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::{
    config::Config,
    error::{Error, Result},
    filelock::{AcquireMode, Lease, LockError, LockManager},
    launch::{ServerLauncher, StartOptions, StartRequest},
    paths::StateLayout,
};

/// Poll interval for bounded start-lock waits.
const BOUNDED_WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Externally visible result of one coordination attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinationOutcome {
    /// No server was running; one was launched.
    Started,
    /// A server already holds the server lock for this project. Benign.
    AlreadyRunning,
    /// A bounded wait for the start lock expired. Only produced under
    /// [`WaitPolicy::Bounded`].
    LockContention,
}

impl std::fmt::Display for CoordinationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::AlreadyRunning => write!(f, "already-running"),
            Self::LockContention => write!(f, "lock-contention"),
        }
    }
}

/// How long a contended start lock is waited on.
///
/// The default waits indefinitely, favoring eventual correctness over
/// responsiveness. A bounded wait is opt-in and yields the distinct
/// [`CoordinationOutcome::LockContention`] outcome on expiry.
#[derive(Debug, Clone, Copy, Default)]
pub enum WaitPolicy {
    /// Block until the start lock is released, however long that takes.
    #[default]
    Indefinite,
    /// Poll for the start lock until the timeout elapses.
    Bounded {
        /// Total time to keep trying.
        timeout: Duration,
        /// Delay between attempts.
        poll_interval: Duration,
    },
}

impl WaitPolicy {
    /// Bounded wait with the default poll interval.
    #[must_use]
    pub const fn bounded(timeout: Duration) -> Self {
        Self::Bounded {
            timeout,
            poll_interval: BOUNDED_WAIT_POLL_INTERVAL,
        }
    }
}

/// Logging capability injected into the coordinator.
///
/// Exactly two messages cross this seam; keeping it a trait keeps the
/// coordinator testable without a tracing backend.
pub trait StartObserver: Send + Sync {
    /// The start lock is contended; the attempt is escalating to a blocking
    /// wait. Emitted at most once per coordination attempt.
    fn waiting_on_start_lock(&self);

    /// A server is already running for `project_root`; the attempt is being
    /// skipped.
    fn server_already_running(&self, project_root: &Path);
}

/// Production observer forwarding to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl StartObserver for TracingObserver {
    fn waiting_on_start_lock(&self) {
        tracing::info!("Waiting on the start lock.");
    }

    fn server_already_running(&self, project_root: &Path) {
        tracing::warn!(
            "Server already running at `{}`, skipping.",
            project_root.display()
        );
    }
}

/// Start-lock acquisition phases.
///
/// `Probing` tries once without blocking so contention can be reported
/// before the attempt commits to waiting; `Waiting` blocks. The only
/// transition is `Probing` → `Waiting`, on [`LockError::Busy`] — any other
/// failure aborts the attempt instead of being silently retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Probing,
    Waiting,
}

/// Runs the double-lock protocol and launches the server on success.
pub struct StartCoordinator<'a> {
    layout: &'a StateLayout,
    config: &'a Config,
    options: StartOptions,
    locks: LockManager,
    launcher: &'a dyn ServerLauncher,
    observer: &'a dyn StartObserver,
    wait: WaitPolicy,
}

impl<'a> StartCoordinator<'a> {
    /// Create a coordinator for one project.
    #[must_use]
    pub fn new(
        layout: &'a StateLayout,
        config: &'a Config,
        options: StartOptions,
        launcher: &'a dyn ServerLauncher,
        observer: &'a dyn StartObserver,
    ) -> Self {
        Self {
            layout,
            config,
            options,
            locks: LockManager::new().with_create_parent_dirs(true),
            launcher,
            observer,
            wait: WaitPolicy::default(),
        }
    }

    /// Set the wait policy for a contended start lock.
    #[must_use]
    pub const fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Run one coordination attempt.
    ///
    /// Launches the server as a side effect only on the
    /// [`CoordinationOutcome::Started`] outcome. Both leases are released on
    /// every exit path, including error propagation.
    ///
    /// # Errors
    ///
    /// Returns an error on OS-level lock failures
    /// ([`LockError::Unavailable`]) and launcher failures. Simple contention
    /// is never an error: on the start lock it escalates to a wait, on the
    /// server lock it becomes [`CoordinationOutcome::AlreadyRunning`].
    pub async fn coordinate(&self) -> Result<CoordinationOutcome> {
        let Some(_start_lease) = self.acquire_start_lock().await? else {
            return Ok(CoordinationOutcome::LockContention);
        };

        // Probe liveness. A running server holds its lock for its own
        // lifetime, so contention here means the project is already served.
        match self
            .locks
            .acquire(&self.layout.server_lock(), AcquireMode::NonBlocking)
        {
            Ok(probe) => drop(probe),
            Err(LockError::Busy { .. }) => {
                self.observer
                    .server_already_running(self.layout.project_root());
                return Ok(CoordinationOutcome::AlreadyRunning);
            }
            Err(err) => return Err(err.into()),
        }

        let request =
            StartRequest::from_config(self.layout.project_root(), self.config, self.options);
        self.launcher.launch(&request).await?;

        Ok(CoordinationOutcome::Started)
    }

    /// Acquire the start lock, escalating from a single non-blocking probe
    /// to a wait on contention. Returns `None` when a bounded wait expires.
    async fn acquire_start_lock(&self) -> Result<Option<Lease>> {
        let path = self.layout.start_lock();
        let mut phase = Phase::Probing;

        loop {
            match phase {
                Phase::Probing => {
                    match self.locks.acquire(&path, AcquireMode::NonBlocking) {
                        Ok(lease) => return Ok(Some(lease)),
                        Err(LockError::Busy { .. }) => {
                            self.observer.waiting_on_start_lock();
                            phase = Phase::Waiting;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Phase::Waiting => return self.wait_for_start_lock(&path).await,
            }
        }
    }

    async fn wait_for_start_lock(&self, path: &Path) -> Result<Option<Lease>> {
        match self.wait {
            WaitPolicy::Indefinite => {
                // The blocking flock call would stall the runtime; park it on
                // the blocking pool instead.
                let locks = self.locks;
                let path = path.to_path_buf();
                let lease =
                    tokio::task::spawn_blocking(move || locks.acquire(&path, AcquireMode::Blocking))
                        .await
                        .map_err(|e| Error::Interrupted(e.to_string()))??;
                Ok(Some(lease))
            }
            WaitPolicy::Bounded {
                timeout,
                poll_interval,
            } => {
                let deadline = Instant::now() + timeout;
                loop {
                    match self.locks.acquire(path, AcquireMode::NonBlocking) {
                        Ok(lease) => return Ok(Some(lease)),
                        Err(LockError::Busy { .. }) => {
                            if Instant::now() >= deadline {
                                return Ok(None);
                            }
                            tokio::time::sleep(poll_interval).await;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
            }
        }
    }
}
