//! Where the config file lives, and writing the commented default.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use beacon_common::ConfigError;
use tracing::{debug, info};

use super::template::default_config_toml;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "BEACON_CONFIG";

/// The config file to use: `$BEACON_CONFIG` when set and non-empty,
/// otherwise `beacon/config.toml` under the platform config directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    resolve_config_path(std::env::var_os(CONFIG_PATH_ENV), dirs::config_dir())
}

pub(crate) fn resolve_config_path(
    override_path: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        debug!(env = CONFIG_PATH_ENV, "Using config path from the environment");
        return Ok(PathBuf::from(path));
    }
    config_dir
        .map(|dir| dir.join("beacon").join("config.toml"))
        .ok_or_else(|| {
            ConfigError::ParseError(format!(
                "no platform config directory; set {CONFIG_PATH_ENV} to a config file"
            ))
        })
}

/// Write the commented default config to `path`. A file that already
/// exists is left untouched, so several peers starting at once cannot
/// clobber each other's edits.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let io_error = |action: &str, target: &Path, e: std::io::Error| {
        ConfigError::ParseError(format!("cannot {action} {}: {e}", target.display()))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "Config appeared meanwhile; keeping it");
            return Ok(());
        }
        Err(e) => return Err(io_error("create", path, e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| io_error("write", path, e))?;

    info!(path = %path.display(), "Created default config");
    Ok(())
}
