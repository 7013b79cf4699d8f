//! Configuration loading and merging.
//!
//! Each source is parsed into a partial overlay with optional fields, merged
//! field-wise onto the accumulated configuration, then validated once at the
//! end. All merge operations return new instances.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::types::{AnalysisConfig, Config, ServerConfig};
use crate::{paths::StateLayout, Error, Result};

/// Partially specified configuration, as read from a single TOML source.
#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    server: Option<PartialServerConfig>,
    analysis: Option<PartialAnalysisConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialServerConfig {
    binary: Option<String>,
    workers: Option<usize>,
    typeshed: Option<String>,
    expected_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialAnalysisConfig {
    directories: Option<Vec<String>>,
    search_path: Option<Vec<String>>,
    use_watchman: Option<bool>,
}

/// Load configuration for one project, with hierarchy.
///
/// # Errors
///
/// Returns an error if a config file is malformed TOML, an env override
/// fails to parse, or the merged values fail validation.
pub fn load_config(layout: &StateLayout) -> Result<Config> {
    let config = Config::default();

    let config = match global_config_path() {
        Some(path) if path.exists() => merge(config, load_toml_file(&path)?),
        _ => config,
    };

    let project_path = layout.config_file();
    let config = if project_path.exists() {
        merge(config, load_toml_file(&project_path)?)
    } else {
        config
    };

    let config = apply_env_overrides(config)?;
    validate(&config)?;
    Ok(config)
}

/// Path to the global config file, if a home directory can be determined.
#[must_use]
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "keel")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn load_toml_file(path: &Path) -> Result<PartialConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    toml::from_str(&raw)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
}

fn merge(base: Config, overlay: PartialConfig) -> Config {
    let server = overlay.server.unwrap_or_default();
    let analysis = overlay.analysis.unwrap_or_default();

    Config {
        server: ServerConfig {
            binary: server.binary.unwrap_or(base.server.binary),
            workers: server.workers.unwrap_or(base.server.workers),
            typeshed: server.typeshed.unwrap_or(base.server.typeshed),
            expected_version: server
                .expected_version
                .unwrap_or(base.server.expected_version),
        },
        analysis: AnalysisConfig {
            directories: analysis.directories.unwrap_or(base.analysis.directories),
            search_path: analysis.search_path.unwrap_or(base.analysis.search_path),
            use_watchman: analysis.use_watchman.unwrap_or(base.analysis.use_watchman),
        },
    }
}

fn apply_env_overrides(config: Config) -> Result<Config> {
    let workers = match std::env::var("KEEL_WORKERS") {
        Ok(raw) => Some(raw.parse::<usize>().map_err(|e| {
            Error::Config(format!("KEEL_WORKERS must be an integer, got `{raw}`: {e}"))
        })?),
        Err(_) => None,
    };

    Ok(Config {
        server: ServerConfig {
            binary: std::env::var("KEEL_BINARY").unwrap_or(config.server.binary),
            workers: workers.unwrap_or(config.server.workers),
            typeshed: std::env::var("KEEL_TYPESHED").unwrap_or(config.server.typeshed),
            expected_version: std::env::var("KEEL_EXPECTED_VERSION")
                .unwrap_or(config.server.expected_version),
        },
        analysis: config.analysis,
    })
}

fn validate(config: &Config) -> Result<()> {
    if config.server.binary.trim().is_empty() {
        return Err(Error::Config(
            "server.binary cannot be empty".to_string(),
        ));
    }
    if config.server.workers == 0 {
        return Err(Error::Config(
            "server.workers must be at least 1".to_string(),
        ));
    }
    Ok(())
}
