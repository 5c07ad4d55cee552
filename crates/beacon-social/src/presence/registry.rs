use std::collections::HashMap;

use tracing::debug;

use super::types::{transition, PresenceRecord, PresenceTransition};
use crate::bus::Subscription;
use crate::error::IgnoreReason;
use crate::protocol::{Envelope, PresencePayload};

/// Presence records for one room, including our own.
#[derive(Debug)]
pub struct PresenceRegistry {
    room_id: String,
    local_handle: String,
    records: HashMap<String, PresenceRecord>,
}

impl PresenceRegistry {
    pub fn new(room_id: &str, local_handle: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
            local_handle: local_handle.to_string(),
            records: HashMap::new(),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Publish our call state to the room and record it locally.
    pub fn announce(&mut self, subscription: &Subscription, in_call: bool) -> PresenceTransition {
        let payload = PresencePayload {
            room_id: self.room_id.clone(),
            handle: self.local_handle.clone(),
            in_call,
        };
        subscription.publish(Envelope::presence(&self.local_handle, payload));
        let local = self.local_handle.clone();
        self.record(&local, in_call)
    }

    /// Apply a remote peer's announcement.
    pub fn on_presence(
        &mut self,
        payload: &PresencePayload,
    ) -> Result<PresenceTransition, IgnoreReason> {
        if payload.room_id != self.room_id {
            debug!(room_id = %payload.room_id, "Presence for another room ignored");
            return Err(IgnoreReason::StaleSignal);
        }
        if payload.handle == self.local_handle {
            return Err(IgnoreReason::SelfMessage);
        }
        Ok(self.record(&payload.handle, payload.in_call))
    }

    fn record(&mut self, handle: &str, in_call: bool) -> PresenceTransition {
        let previous = self.is_in_call(handle);
        self.records.insert(
            handle.to_string(),
            PresenceRecord {
                handle: handle.to_string(),
                in_call,
            },
        );
        transition(previous, in_call)
    }

    pub fn get(&self, handle: &str) -> Option<&PresenceRecord> {
        self.records.get(handle)
    }

    pub fn is_in_call(&self, handle: &str) -> bool {
        self.records.get(handle).is_some_and(|r| r.in_call)
    }

    pub fn local_in_call(&self) -> bool {
        self.is_in_call(&self.local_handle)
    }

    /// Remote peers currently in call, sorted by handle.
    pub fn in_call_peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self
            .records
            .values()
            .filter(|r| r.in_call && r.handle != self.local_handle)
            .map(|r| r.handle.clone())
            .collect();
        peers.sort();
        peers
    }

    pub fn known_peers(&self) -> usize {
        self.records
            .keys()
            .filter(|h| **h != self.local_handle)
            .count()
    }
}
