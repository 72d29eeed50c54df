use std::path::{Path, PathBuf};
use std::{env, fs};

use proctor_core::MonitorConfig;

use crate::error::{Result, StoreError};
use crate::store::Store;

/// Session database file name inside the data directory.
pub const DB_FILE: &str = "sessions.db";

/// Optional monitor configuration file inside the data directory.
pub const CONFIG_FILE: &str = "proctor.toml";

/// Default data directory: `~/.proctor`.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".proctor")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Open (creating if needed) the session database under `dir`.
pub fn open_in(dir: &Path) -> Result<Store> {
    fs::create_dir_all(dir)?;
    let path = dir.join(DB_FILE);
    tracing::debug!("opening session store at {}", path.display());
    Store::open(&path)
}

/// Load monitor settings.
///
/// An explicit `path` must exist. Without one, `<dir>/proctor.toml` is used
/// when present and defaults otherwise. Missing keys take their defaults.
pub fn load_config(dir: &Path, path: Option<&Path>) -> Result<MonitorConfig> {
    let file = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let candidate = dir.join(CONFIG_FILE);
            if !candidate.exists() {
                return Ok(MonitorConfig::default());
            }
            candidate
        }
    };
    let content = fs::read_to_string(&file)?;
    let config: MonitorConfig = toml::from_str(&content)
        .map_err(|e| StoreError::InvalidData(format!("{}: {e}", file.display())))?;
    config
        .validate()
        .map_err(|msg| StoreError::InvalidData(format!("{}: {msg}", file.display())))?;
    Ok(config)
}
