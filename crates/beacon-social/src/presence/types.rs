//! Presence records and transitions.

/// Last known call state of one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceRecord {
    pub handle: String,
    pub in_call: bool,
}

/// Effect of a presence update on a peer's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceTransition {
    /// Peer went from not-in-call (or unknown) to in-call.
    Join,
    /// Peer went from in-call to not-in-call.
    Leave,
    Unchanged,
}

/// Transition between two presence flags. An unknown peer counts as not
/// in call.
pub fn transition(previous: bool, next: bool) -> PresenceTransition {
    match (previous, next) {
        (false, true) => PresenceTransition::Join,
        (true, false) => PresenceTransition::Leave,
        _ => PresenceTransition::Unchanged,
    }
}
