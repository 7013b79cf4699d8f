//! Keel CLI - singleton launcher for the keel analysis server.
//!
//! Binary name: `keel`

use std::process;

mod cli;
mod commands;

#[tokio::main]
async fn main() {
    // Human-readable logs go to stderr; stdout is reserved for command
    // output (including `--json`).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli::run().await {
        Ok(code) => {
            #[allow(clippy::exit)]
            process::exit(code);
        }
        Err(err) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Error: {err:#}");
            }

            let code = err
                .downcast_ref::<keel_core::Error>()
                .map_or(1, keel_core::Error::exit_code);

            #[allow(clippy::exit)]
            process::exit(code);
        }
    }
}
