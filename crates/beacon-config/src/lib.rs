//! Beacon configuration system.
//!
//! TOML-based configuration with validation. All sections use defaults
//! so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use beacon_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{BeaconConfig, CONFIG_SCHEMA_VERSION};

use beacon_common::ConfigError;

/// Load config from the platform default path and validate it.
///
/// Creates a default `config.toml` if none exists.
pub fn load_config() -> Result<BeaconConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from an explicit path and validate it.
pub fn load_config_from(path: &std::path::Path) -> Result<BeaconConfig, ConfigError> {
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &BeaconConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let json = config_to_json(&BeaconConfig::default());
        assert!(json.contains("\"identity\""));
        assert!(json.contains("\"call\""));
        assert!(json.contains("\"bus\""));
        assert!(json.contains("\"chat\""));
        assert!(json.contains("\"alerts\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let json = config_to_json(&BeaconConfig::default());
        let parsed: BeaconConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.identity.handle, "guest");
        assert_eq!(parsed.call.stun_servers, vec![schema::DEFAULT_STUN_SERVER]);
    }

    #[test]
    fn load_config_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[alerts]\nvolume = 3.0\n").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
