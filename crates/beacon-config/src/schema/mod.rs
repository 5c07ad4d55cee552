//! Configuration schema types for Beacon.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with defaults that run a working local room.

mod call;
mod identity;
mod social;
mod system;

pub use call::*;
pub use identity::*;
pub use social::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Beacon.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct BeaconConfig {
    pub identity: IdentityConfig,
    pub call: CallConfig,
    pub bus: BusConfig,
    pub chat: ChatConfig,
    pub alerts: AlertsConfig,
    pub logging: LoggingConfig,
}
