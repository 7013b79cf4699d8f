//! CLI argument parsing and dispatch.

pub mod args;

use anyhow::Result;

use crate::commands::start;

/// Parse arguments and run the selected command, returning the process exit
/// code.
pub async fn run() -> Result<i32> {
    let matches = args::build_cli().get_matches();

    match matches.subcommand() {
        Some(("start", sub_m)) => {
            start::run(start::StartArgs {
                terminal: sub_m.get_flag("terminal"),
                no_watchman: sub_m.get_flag("no-watchman"),
                lock_timeout: sub_m.get_one::<u64>("lock-timeout").copied(),
                json: sub_m.get_flag("json"),
            })
            .await
        }
        _ => Err(anyhow::anyhow!("unknown command")),
    }
}
