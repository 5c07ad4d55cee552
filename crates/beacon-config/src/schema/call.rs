//! Call and media configuration types.

use serde::{Deserialize, Serialize};

/// Default public STUN server used when none is configured.
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Which local devices are captured when joining a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaDefaultsConfig {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaDefaultsConfig {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Call configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// STUN server URLs handed to every peer connection. No TURN support.
    pub stun_servers: Vec<String>,
    pub media: MediaDefaultsConfig,
    /// Buffered UI events before the call manager applies backpressure.
    pub event_capacity: u32,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            stun_servers: vec![DEFAULT_STUN_SERVER.into()],
            media: MediaDefaultsConfig::default(),
            event_capacity: 256,
        }
    }
}
