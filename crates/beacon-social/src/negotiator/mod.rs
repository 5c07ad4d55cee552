//! Offer/answer/ICE negotiation with every in-call peer.
//!
//! Both sides of a pair call [`Negotiator::ensure`]; only the side whose
//! handle sorts higher calls [`Negotiator::make_offer`] (see
//! [`should_offer`]). That keeps offers from crossing without needing a
//! rollback path.

mod manager;
mod session;

pub use manager::{Negotiator, SignalOutcome};
pub use session::{DescriptionOp, Session, SessionState, SignalingState};

/// Initiator election: the lexicographically larger handle offers.
pub fn should_offer(local_handle: &str, peer: &str) -> bool {
    local_handle > peer
}

#[cfg(test)]
mod tests;
