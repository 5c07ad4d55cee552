use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Longest handle accepted in a room.
pub const MAX_HANDLE_LEN: usize = 20;

/// The local participant: a room-unique handle plus a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub handle: String,
    pub display_name: String,
}

impl Identity {
    /// Build an identity from user input. The handle is normalised with
    /// [`clean_handle`]; an empty display name falls back to the handle.
    pub fn new(raw_handle: &str, display_name: &str) -> Result<Self, IdentityError> {
        let handle = clean_handle(raw_handle);
        if handle.is_empty() {
            return Err(IdentityError(raw_handle.to_string()));
        }
        let display_name = match display_name.trim() {
            "" => handle.clone(),
            name => name.to_string(),
        };
        Ok(Self {
            handle,
            display_name,
        })
    }

    /// Returns a public view of this identity.
    pub fn to_public(&self) -> PublicIdentity {
        PublicIdentity {
            handle: self.handle.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicIdentity {
    pub handle: String,
    pub display_name: String,
}

/// Normalise a handle: trim, lowercase, keep `a-z0-9_`, cap the length.
pub fn clean_handle(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .take(MAX_HANDLE_LEN)
        .collect()
}
