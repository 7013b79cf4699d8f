//! Start the analysis server for the current project.
//!
//! Thin wrapper over `keel_core::StartCoordinator`: loads configuration,
//! resolves the server binary, runs one coordination attempt, and maps the
//! outcome to output and an exit code.

use std::time::Duration;

use anyhow::{Context, Result};
use keel_core::{
    load_config, BinaryLauncher, CoordinationOutcome, StartCoordinator, StartOptions, StateLayout,
    TracingObserver, WaitPolicy,
};

/// Exit code for a bounded wait that expired before the start lock freed up.
const EXIT_LOCK_CONTENTION: i32 = 4;

/// Parsed `keel start` arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartArgs {
    pub terminal: bool,
    pub no_watchman: bool,
    /// Bounded start-lock wait in seconds; `None` waits indefinitely.
    pub lock_timeout: Option<u64>,
    pub json: bool,
}

/// Run one start attempt in the current directory, returning the exit code.
pub async fn run(args: StartArgs) -> Result<i32> {
    let project_root =
        std::env::current_dir().context("failed to determine the project directory")?;
    let layout = StateLayout::new(&project_root);

    let config = load_config(&layout)?;
    let launcher = BinaryLauncher::resolve(&config.server.binary)?;
    let observer = TracingObserver;

    let options = StartOptions {
        terminal: args.terminal,
        no_watchman: args.no_watchman,
    };
    let wait = args.lock_timeout.map_or(WaitPolicy::Indefinite, |secs| {
        WaitPolicy::bounded(Duration::from_secs(secs))
    });

    let coordinator =
        StartCoordinator::new(&layout, &config, options, &launcher, &observer)
            .with_wait_policy(wait);
    let outcome = coordinator.coordinate().await?;

    if args.json {
        let envelope = serde_json::json!({
            "outcome": outcome,
            "project_root": project_root,
        });
        println!("{envelope}");
    } else {
        match outcome {
            CoordinationOutcome::Started => {
                println!("Server started for {}.", project_root.display());
            }
            // The coordinator's observer already warned with the project path.
            CoordinationOutcome::AlreadyRunning => {}
            CoordinationOutcome::LockContention => {
                eprintln!("Timed out waiting on the start lock.");
            }
        }
    }

    Ok(exit_code(outcome))
}

/// `AlreadyRunning` is a benign outcome, not an operator mistake; only an
/// expired bounded wait gets its own nonzero code.
const fn exit_code(outcome: CoordinationOutcome) -> i32 {
    match outcome {
        CoordinationOutcome::Started | CoordinationOutcome::AlreadyRunning => 0,
        CoordinationOutcome::LockContention => EXIT_LOCK_CONTENTION,
    }
}
