//! Conversation rooms, their membership, and per-identity friend lists.
//!
//! A room is either a direct conversation between two handles or a named
//! group. The call layer only ever asks one question of it: who belongs to
//! a room (see [`MembershipStore`]).

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::identity::clean_handle;
use crate::platform::MembershipStore;

/// Kind of conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Dm,
    Group,
}

/// A conversation room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub kind: RoomKind,
    pub name: String,
    pub members: BTreeSet<String>,
}

/// In-memory room directory.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<String, Room>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reuse) the direct room between two handles. The id is
    /// derived from the sorted pair, so both sides agree on it.
    pub fn direct(&mut self, a: &str, b: &str) -> &Room {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let id = format!("dm_{lo}_{hi}");
        self.rooms.entry(id.clone()).or_insert_with(|| Room {
            id,
            kind: RoomKind::Dm,
            name: format!("{lo} & {hi}"),
            members: [lo.to_string(), hi.to_string()].into_iter().collect(),
        })
    }

    /// Create a group room. Returns false if the id is taken.
    pub fn create_group<I, S>(&mut self, id: &str, name: &str, members: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.rooms.contains_key(id) {
            return false;
        }
        self.rooms.insert(
            id.to_string(),
            Room {
                id: id.to_string(),
                kind: RoomKind::Group,
                name: name.to_string(),
                members: members.into_iter().map(Into::into).collect(),
            },
        );
        true
    }

    /// Add a handle to a room (invite accepted). Creates an unnamed group if
    /// the room is unknown.
    pub fn join(&mut self, room_id: &str, handle: &str) {
        let room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room {
                id: room_id.to_string(),
                kind: RoomKind::Group,
                name: room_id.to_string(),
                members: BTreeSet::new(),
            });
        room.members.insert(handle.to_string());
    }

    pub fn leave(&mut self, room_id: &str, handle: &str) {
        if let Some(room) = self.rooms.get_mut(room_id) {
            room.members.remove(handle);
        }
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn list(&self) -> Vec<&Room> {
        self.rooms.values().collect()
    }

    /// Rooms a handle belongs to.
    pub fn rooms_of(&self, handle: &str) -> Vec<&Room> {
        self.rooms
            .values()
            .filter(|r| r.members.contains(handle))
            .collect()
    }
}

impl MembershipStore for RoomDirectory {
    fn members(&self, room_id: &str) -> HashSet<String> {
        self.rooms
            .get(room_id)
            .map(|r| r.members.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Friend handles, kept per local identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendList {
    by_owner: HashMap<String, BTreeSet<String>>,
}

impl FriendList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a friend for `owner`. The handle is normalised first; returns
    /// `false` if it was already a friend or is the owner itself.
    pub fn add(&mut self, owner: &str, raw_handle: &str) -> Result<bool, IdentityError> {
        let handle = clean_handle(raw_handle);
        if handle.is_empty() {
            return Err(IdentityError(raw_handle.to_string()));
        }
        if handle == owner {
            return Ok(false);
        }
        Ok(self
            .by_owner
            .entry(owner.to_string())
            .or_default()
            .insert(handle))
    }

    pub fn remove(&mut self, owner: &str, handle: &str) -> bool {
        self.by_owner
            .get_mut(owner)
            .is_some_and(|friends| friends.remove(handle))
    }

    pub fn contains(&self, owner: &str, handle: &str) -> bool {
        self.by_owner
            .get(owner)
            .is_some_and(|friends| friends.contains(handle))
    }

    /// Friends of `owner`, sorted.
    pub fn of(&self, owner: &str) -> Vec<&str> {
        self.by_owner
            .get(owner)
            .map(|friends| friends.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
