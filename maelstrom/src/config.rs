//! Locating and reading the configuration file

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::Maelstrom;

/// Searched in order when no path is given explicitly
pub const DEFAULT_PATHS: [&str; 2] = [
    "./maelstrom.config.ron",
    "/etc/maelstrom/maelstrom.config.ron",
];

/// Find the configuration file using the following precedence:
/// 1. `explicit` (the `--config` flag or `MAELSTROM_CONFIG`), which must exist
/// 2. ./maelstrom.config.ron (current working directory)
/// 3. /etc/maelstrom/maelstrom.config.ron (system-wide config)
///
/// Returns `None` if no file was named and none of the defaults exist.
///
/// # Errors
///
/// Returns an error if `explicit` names a file that does not exist.
pub fn find_config_file(explicit: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        anyhow::ensure!(
            path.exists(),
            "Configuration file does not exist: {}",
            path.display()
        );
        return Ok(Some(path.to_path_buf()));
    }

    Ok(DEFAULT_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists()))
}

/// Read and parse the configuration at `path`
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid RON.
pub fn load(path: &Path) -> anyhow::Result<Maelstrom> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    ron::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
}
