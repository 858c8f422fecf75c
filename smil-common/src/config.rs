//! Configuration file discovery and loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SMIL_PLAYER_CONFIG";

const APP_DIR: &str = "smil-player";
const CONFIG_FILE: &str = "config.toml";

/// Locate the bootstrap config file
///
/// Priority order:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. `~/.config/smil-player/config.toml`
/// 4. `/etc/smil-player/config.toml` (Linux only)
///
/// Returns `None` when nothing was named and no default file exists; callers
/// then run on built-in defaults. Explicit paths are returned even if missing so
/// the load reports a proper error.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_candidates().into_iter().find(|path| path.exists())
}

/// Platform default config locations, most specific first
fn default_config_candidates() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .into_iter()
        .collect();
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILE));
    }
    candidates
}

/// Read and decode a TOML file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Loading config from {}", path.display());
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}
