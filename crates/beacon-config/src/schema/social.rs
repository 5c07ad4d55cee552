//! Room bus, chat history, and alert configuration types.

use serde::{Deserialize, Serialize};

/// In-process channel bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Prefix for per-room channel names (`{namespace}:{room_id}`).
    pub namespace: String,
    /// Envelopes buffered per room before slow subscribers start skipping.
    pub capacity: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            namespace: "beacon-room".into(),
            capacity: 256,
        }
    }
}

/// Chat history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub max_messages_per_room: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_messages_per_room: 500,
        }
    }
}

/// Alert tone and desktop notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub enabled: bool,
    /// Peak gain of alert tones.
    pub volume: f64,
    pub desktop_notifications: bool,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.25,
            desktop_notifications: true,
        }
    }
}
