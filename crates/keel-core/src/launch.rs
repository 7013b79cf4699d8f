//! Server launch requests and the process-launcher seam.
//!
//! A [`StartRequest`] is an immutable description of how to launch the
//! analysis server, built once per successful coordination and consumed
//! exactly once. [`ServerLauncher`] is the seam the coordinator invokes;
//! the production implementation spawns the configured server binary and
//! gates success on its exit status.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use itertools::Itertools;
use tokio::process::Command;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Subcommand passed to the server binary.
const SERVER_COMMAND: &str = "start";

/// Per-invocation start options, from CLI flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    /// Run the server attached to the terminal.
    pub terminal: bool,
    /// Disable watchman even when the configuration enables it.
    pub no_watchman: bool,
}

/// Immutable description of one server launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    /// The project the server is started for.
    pub project_root: PathBuf,
    /// Directories analysis is restricted to, order-stable and deduplicated.
    pub analysis_directories: Vec<PathBuf>,
    /// Module search paths, passed through verbatim.
    pub search_path: Vec<String>,
    /// Number of analysis workers.
    pub workers: usize,
    /// Typeshed the server reads stubs from.
    pub typeshed: PathBuf,
    /// Binary version the server is expected to report.
    pub expected_version: String,
    /// Whether the server runs attached to the terminal.
    pub terminal: bool,
    /// Whether the server uses watchman.
    pub use_watchman: bool,
}

impl StartRequest {
    /// Build a request from configuration and per-invocation options.
    ///
    /// Relative analysis directories are resolved against the project root;
    /// duplicates are dropped while preserving first-seen order.
    #[must_use]
    pub fn from_config(project_root: &Path, config: &Config, options: StartOptions) -> Self {
        let analysis_directories = config
            .analysis
            .directories
            .iter()
            .map(|dir| {
                let dir = Path::new(dir);
                let resolved = if dir.is_absolute() {
                    dir.to_path_buf()
                } else {
                    project_root.join(dir)
                };
                // Lexical cleanup so `.` entries compare equal to the root.
                resolved.components().collect::<PathBuf>()
            })
            .unique()
            .collect();

        Self {
            project_root: project_root.to_path_buf(),
            analysis_directories,
            search_path: config.analysis.search_path.clone(),
            workers: config.server.workers,
            typeshed: PathBuf::from(&config.server.typeshed),
            expected_version: config.server.expected_version.clone(),
            terminal: options.terminal,
            use_watchman: config.analysis.use_watchman && !options.no_watchman,
        }
    }

    /// The ordered flag list handed to the server binary.
    ///
    /// The filter-directories flag is emitted only when the analysis set is a
    /// strict superset of the project root: restricting to exactly the root
    /// (or to nothing) would be redundant.
    #[must_use]
    pub fn to_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();

        if self.analysis_directories.len() > 1
            && self
                .analysis_directories
                .iter()
                .any(|dir| dir == &self.project_root)
        {
            flags.push("-filter-directories".to_string());
            flags.push(
                self.analysis_directories
                    .iter()
                    .map(|dir| dir.display().to_string())
                    .join(","),
            );
        }

        if self.use_watchman {
            flags.push("-use-watchman".to_string());
        }
        if self.terminal {
            flags.push("-terminal".to_string());
        }

        flags.extend([
            "-workers".to_string(),
            self.workers.to_string(),
            "-typeshed".to_string(),
            self.typeshed.display().to_string(),
            "-expected-binary-version".to_string(),
            self.expected_version.clone(),
        ]);

        if !self.search_path.is_empty() {
            flags.push("-search-path".to_string());
            flags.push(self.search_path.iter().join(","));
        }

        flags
    }
}

/// Launches the analysis server. Invoked exactly once per successful
/// coordination, while the start lock is held.
#[async_trait]
pub trait ServerLauncher: Send + Sync {
    /// Launch the server described by `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the launch could not be performed or the launcher
    /// reported failure; the coordinator propagates it as-is.
    async fn launch(&self, request: &StartRequest) -> Result<()>;
}

/// Production launcher: spawns the server binary as a child process.
///
/// The binary is expected to daemonize itself; the launcher only observes
/// the synchronous exit status of the `start` invocation.
#[derive(Debug, Clone)]
pub struct BinaryLauncher {
    binary: PathBuf,
}

impl BinaryLauncher {
    /// Resolve the configured binary name on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the binary cannot be found.
    pub fn resolve(binary: &str) -> Result<Self> {
        which::which(binary)
            .map(|binary| Self { binary })
            .map_err(|e| Error::Config(format!("server binary `{binary}` not found: {e}")))
    }

    /// The resolved binary path.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl ServerLauncher for BinaryLauncher {
    async fn launch(&self, request: &StartRequest) -> Result<()> {
        let flags = request.to_flags();
        tracing::debug!(
            "launching {} {SERVER_COMMAND} {}",
            self.binary.display(),
            flags.iter().join(" ")
        );

        let output = Command::new(&self.binary)
            .arg(SERVER_COMMAND)
            .args(&flags)
            .current_dir(&request.project_root)
            .output()
            .await
            .map_err(|source| Error::LaunchSpawn {
                command: self.binary.display().to_string(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::LaunchFailed {
                command: self.binary.display().to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;

    use super::*;

    fn request_with_directories(root: &str, directories: &[&str]) -> StartRequest {
        StartRequest {
            project_root: PathBuf::from(root),
            analysis_directories: directories.iter().map(PathBuf::from).collect(),
            search_path: Vec::new(),
            workers: 4,
            typeshed: PathBuf::from("/typeshed"),
            expected_version: "abc123".to_string(),
            terminal: false,
            use_watchman: true,
        }
    }

    #[test]
    fn filter_directories_omitted_for_project_root_alone() {
        let request = request_with_directories("/project", &["/project"]);
        let flags = request.to_flags();

        assert!(!flags.contains(&"-filter-directories".to_string()));
    }

    #[test]
    fn filter_directories_omitted_when_empty() {
        let request = request_with_directories("/project", &[]);
        let flags = request.to_flags();

        assert!(!flags.contains(&"-filter-directories".to_string()));
    }

    #[test]
    fn filter_directories_omitted_without_project_root() {
        let request = request_with_directories("/project", &["/a", "/b"]);
        let flags = request.to_flags();

        assert!(!flags.contains(&"-filter-directories".to_string()));
    }

    #[test]
    fn filter_directories_emitted_for_strict_superset_order_stable() {
        let request = request_with_directories("/project", &["/project", "/project/vendored"]);
        let flags = request.to_flags();

        let position = flags
            .iter()
            .position(|flag| flag == "-filter-directories")
            .unwrap();
        assert_eq!(flags[position + 1], "/project,/project/vendored");
    }

    #[test]
    fn watchman_flag_respects_disablement() {
        let mut request = request_with_directories("/project", &[]);
        assert!(request.to_flags().contains(&"-use-watchman".to_string()));

        request.use_watchman = false;
        assert!(!request.to_flags().contains(&"-use-watchman".to_string()));
    }

    #[test]
    fn terminal_flag_only_when_requested() {
        let mut request = request_with_directories("/project", &[]);
        assert!(!request.to_flags().contains(&"-terminal".to_string()));

        request.terminal = true;
        assert!(request.to_flags().contains(&"-terminal".to_string()));
    }

    #[test]
    fn workers_typeshed_and_version_always_present() {
        let flags = request_with_directories("/project", &[]).to_flags();

        let workers = flags.iter().position(|flag| flag == "-workers").unwrap();
        assert_eq!(flags[workers + 1], "4");
        let typeshed = flags.iter().position(|flag| flag == "-typeshed").unwrap();
        assert_eq!(flags[typeshed + 1], "/typeshed");
        let version = flags
            .iter()
            .position(|flag| flag == "-expected-binary-version")
            .unwrap();
        assert_eq!(flags[version + 1], "abc123");
    }

    #[test]
    fn search_path_flag_only_when_configured() {
        let mut request = request_with_directories("/project", &[]);
        assert!(!request.to_flags().contains(&"-search-path".to_string()));

        request.search_path = vec!["x".to_string(), "y".to_string()];
        let flags = request.to_flags();
        let position = flags.iter().position(|flag| flag == "-search-path").unwrap();
        assert_eq!(flags[position + 1], "x,y");
    }

    #[test]
    fn from_config_resolves_relative_directories_and_dedups() {
        let mut config = Config::default();
        config.analysis.directories = vec![
            ".".to_string(),
            "vendored".to_string(),
            "/abs/stubs".to_string(),
            "vendored".to_string(),
        ];

        let request =
            StartRequest::from_config(Path::new("/project"), &config, StartOptions::default());

        assert_eq!(
            request.analysis_directories,
            vec![
                PathBuf::from("/project"),
                PathBuf::from("/project/vendored"),
                PathBuf::from("/abs/stubs"),
            ]
        );
    }

    #[test]
    fn no_watchman_option_overrides_config() {
        let config = Config::default();
        let options = StartOptions {
            terminal: false,
            no_watchman: true,
        };

        let request = StartRequest::from_config(Path::new("/project"), &config, options);

        assert!(!request.use_watchman);
    }
}
