//! Configuration type definitions.
//!
//! Pure data holders with derived traits; loading and merging live in
//! `load.rs`.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Worker count used when the host parallelism cannot be determined.
const FALLBACK_WORKERS: usize = 4;

/// Root configuration structure.
///
/// Loaded from defaults → global → project → env vars.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub analysis: AnalysisConfig,
}

/// How the analysis server itself is invoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Server binary name or path, resolved on `PATH` at launch time.
    pub binary: String,
    /// Number of analysis workers the server runs with.
    pub workers: usize,
    /// Path to the typeshed the server reads stubs from.
    pub typeshed: String,
    /// Binary version the server is expected to report.
    pub expected_version: String,
}

/// What the server analyzes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directories to restrict analysis to. Relative entries are resolved
    /// against the project root. Empty means the whole project.
    pub directories: Vec<String>,
    /// Additional module search paths, passed through verbatim.
    pub search_path: Vec<String>,
    /// Whether the server should use watchman for file watching.
    pub use_watchman: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary: "keel-engine".to_string(),
            workers: default_workers(),
            typeshed: "/usr/share/keel/typeshed".to_string(),
            expected_version: "unversioned".to_string(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            search_path: Vec::new(),
            use_watchman: true,
        }
    }
}

/// Default worker count: one per available core.
fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(FALLBACK_WORKERS, NonZeroUsize::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_any_config_file() {
        let config = Config::default();

        assert_eq!(config.server.binary, "keel-engine");
        assert!(config.server.workers >= 1);
        assert_eq!(config.server.expected_version, "unversioned");
        assert!(config.analysis.directories.is_empty());
        assert!(config.analysis.search_path.is_empty());
        assert!(config.analysis.use_watchman);
    }
}
