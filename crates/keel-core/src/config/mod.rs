//! Configuration for the keel launcher.
//!
//! Loaded in layers, later sources overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Global config: `~/.config/keel/config.toml`
//! 3. Project config: `.keel/config.toml`
//! 4. Environment variables: `KEEL_*`

mod load;
mod types;

pub use load::{global_config_path, load_config};
pub use types::{AnalysisConfig, Config, ServerConfig};
