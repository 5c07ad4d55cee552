//! Local identity configuration.

use serde::{Deserialize, Serialize};

/// Who this instance is inside a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Room-unique handle: lowercase `a-z`, `0-9` and `_`, at most 20 chars.
    pub handle: String,
    /// Name shown next to our messages. Falls back to the handle when empty.
    pub display_name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            handle: "guest".into(),
            display_name: String::new(),
        }
    }
}
