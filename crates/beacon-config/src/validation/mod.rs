//! Full configuration validation.
//!
//! Each section has its own check; this orchestrator calls them all and
//! collects errors into a single `ConfigError`.

mod misc;

#[cfg(test)]
mod tests;

use crate::schema::BeaconConfig;
use beacon_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &BeaconConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    misc::validate_identity(&mut errors, config);
    misc::validate_call(&mut errors, config);
    misc::validate_bus(&mut errors, config);
    misc::validate_chat(&mut errors, config);
    misc::validate_alerts(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
