//! CLI argument definitions and command builders.

use clap::{Arg, ArgAction, Command};

/// Build the top-level `keel` command.
pub fn build_cli() -> Command {
    Command::new("keel")
        .about("Keel analysis server launcher")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(cmd_start())
}

fn cmd_start() -> Command {
    Command::new("start")
        .about("Start the analysis server for this project")
        .long_about(
            "Start the Analysis Server\n\
             \n\
             Starts one keel-engine server for the current project directory.\n\
             Concurrent invocations are serialized through a start lock; if a\n\
             server is already running for this project, the command reports\n\
             it and exits normally without starting a second one.",
        )
        .arg(
            Arg::new("terminal")
                .long("terminal")
                .action(ArgAction::SetTrue)
                .help("Run the server attached to the terminal"),
        )
        .arg(
            Arg::new("no-watchman")
                .long("no-watchman")
                .action(ArgAction::SetTrue)
                .help("Do not use watchman for file watching"),
        )
        .arg(
            Arg::new("lock-timeout")
                .long("lock-timeout")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .help("Give up waiting on a contended start lock after this many seconds"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Output the outcome as JSON for machine parsing"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn start_accepts_all_flags() {
        let matches = build_cli()
            .try_get_matches_from([
                "keel",
                "start",
                "--terminal",
                "--no-watchman",
                "--lock-timeout",
                "30",
                "--json",
            ])
            .unwrap();

        let (name, sub_m) = matches.subcommand().unwrap();
        assert_eq!(name, "start");
        assert!(sub_m.get_flag("terminal"));
        assert!(sub_m.get_flag("no-watchman"));
        assert_eq!(sub_m.get_one::<u64>("lock-timeout"), Some(&30));
        assert!(sub_m.get_flag("json"));
    }
}
