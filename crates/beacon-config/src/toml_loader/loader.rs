//! Core TOML config loading: read from path or platform default.

use crate::schema::BeaconConfig;
use crate::validation;
use beacon_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. Validation failures are
/// logged and the parsed config is returned as-is; callers that need a
/// hard guarantee run [`validation::validate`] themselves.
pub fn load_from_path(path: &Path) -> Result<BeaconConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: BeaconConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e}");
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from `$BEACON_CONFIG`, or else the platform default path.
///
/// On macOS: `~/Library/Application Support/beacon/config.toml`
/// On Linux: `~/.config/beacon/config.toml`
///
/// If the file does not exist, creates a default config file and returns defaults.
pub fn load_default() -> Result<BeaconConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("no config found at {}, creating default", path.display());
            create_default_config(&path)?;
            Ok(BeaconConfig::default())
        }
        Err(e) => Err(e),
    }
}
