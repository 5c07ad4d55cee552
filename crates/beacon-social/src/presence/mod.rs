//! Who in the open room has announced themselves as in-call.
//!
//! Records are only ever changed by `CALL_PRESENCE` envelopes and by our
//! own announcements. They never expire: a peer that vanishes without
//! announcing `inCall=false` stays in call until it says otherwise.

mod registry;
mod types;

pub use registry::PresenceRegistry;
pub use types::{transition, PresenceRecord, PresenceTransition};
