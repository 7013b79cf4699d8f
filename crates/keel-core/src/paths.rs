//! Project state-directory layout.
//!
//! Every path here is fixed relative to the project root. Independent keel
//! processes coordinating on the same project interoperate purely through
//! these paths, so they must not change shape: the start lock lives directly
//! under the state directory, the server lock one level down under `server/`.

use std::path::{Path, PathBuf};

/// Name of the per-project state directory.
const STATE_DIR: &str = ".keel";

/// Lock file serializing concurrent start attempts.
const START_LOCK_FILE: &str = "client.lock";

/// Subdirectory owned by the running server.
const SERVER_DIR: &str = "server";

/// Lock file held by a live server for its lifetime.
const SERVER_LOCK_FILE: &str = "server.lock";

/// Project configuration file.
const CONFIG_FILE: &str = "config.toml";

/// Resolves the fixed state-file layout for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    project_root: PathBuf,
}

impl StateLayout {
    /// Create a layout rooted at the given project directory.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// The project root this layout was created for.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// The per-project state directory (`<root>/.keel`).
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    /// The start lock (`<root>/.keel/client.lock`).
    #[must_use]
    pub fn start_lock(&self) -> PathBuf {
        self.state_dir().join(START_LOCK_FILE)
    }

    /// The server liveness lock (`<root>/.keel/server/server.lock`).
    #[must_use]
    pub fn server_lock(&self) -> PathBuf {
        self.state_dir().join(SERVER_DIR).join(SERVER_LOCK_FILE)
    }

    /// The project configuration file (`<root>/.keel/config.toml`).
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.state_dir().join(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_fixed_relative_to_project_root() {
        let layout = StateLayout::new("/work/project");

        assert_eq!(layout.project_root(), Path::new("/work/project"));
        assert_eq!(layout.state_dir(), PathBuf::from("/work/project/.keel"));
        assert_eq!(
            layout.start_lock(),
            PathBuf::from("/work/project/.keel/client.lock")
        );
        assert_eq!(
            layout.server_lock(),
            PathBuf::from("/work/project/.keel/server/server.lock")
        );
        assert_eq!(
            layout.config_file(),
            PathBuf::from("/work/project/.keel/config.toml")
        );
    }
}
