//! Per-peer session state.

use std::collections::HashMap;

use beacon_common::SessionId;

use crate::error::IgnoreReason;
use crate::media::{RemoteTrack, TrackKind};
use crate::platform::{ConnectionState, PeerConnection, SenderId};

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Lifecycle of a session. Absent sessions are simply not in the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connection created; no offer/answer exchange has completed yet.
    Connecting,
    /// At least one exchange completed.
    Stable,
    Closed,
}

/// Offer/answer state of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

/// A description being applied to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionOp {
    LocalOffer,
    RemoteOffer,
    LocalAnswer,
    RemoteAnswer,
}

impl SignalingState {
    /// State after applying `op`, or a conflict if `op` is not allowed now.
    pub fn apply(self, op: DescriptionOp) -> Result<Self, IgnoreReason> {
        match (self, op) {
            (Self::Stable, DescriptionOp::LocalOffer) => Ok(Self::HaveLocalOffer),
            (Self::Stable, DescriptionOp::RemoteOffer) => Ok(Self::HaveRemoteOffer),
            (Self::HaveLocalOffer, DescriptionOp::RemoteAnswer) => Ok(Self::Stable),
            (Self::HaveRemoteOffer, DescriptionOp::LocalAnswer) => Ok(Self::Stable),
            _ => Err(IgnoreReason::NegotiationConflict),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutboundSender {
    pub id: SenderId,
    pub track_id: String,
}

/// One remote peer's connection while in a call.
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) peer: String,
    pub(crate) state: SessionState,
    pub(crate) signaling: SignalingState,
    pub(crate) connection_state: ConnectionState,
    pub(crate) connection: Box<dyn PeerConnection>,
    pub(crate) senders: HashMap<TrackKind, OutboundSender>,
    pub(crate) remote_tracks: Vec<RemoteTrack>,
}

impl Session {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn signaling(&self) -> SignalingState {
        self.signaling
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    /// Id of the local track currently sent for `kind`.
    pub fn sender_track(&self, kind: TrackKind) -> Option<&str> {
        self.senders.get(&kind).map(|s| s.track_id.as_str())
    }

    pub fn remote_tracks(&self) -> &[RemoteTrack] {
        &self.remote_tracks
    }

    /// Apply a description op to the signaling state; on success the
    /// session is stable once an exchange completes.
    pub(crate) fn advance(&mut self, op: DescriptionOp) -> Result<(), IgnoreReason> {
        self.signaling = self.signaling.apply(op)?;
        if self.signaling == SignalingState::Stable {
            self.state = SessionState::Stable;
        }
        Ok(())
    }

    pub(crate) fn close(&mut self) {
        self.connection.close();
        self.state = SessionState::Closed;
        self.signaling = SignalingState::Closed;
        self.remote_tracks.clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("state", &self.state)
            .field("signaling", &self.signaling)
            .field("senders", &self.senders)
            .field("remote_tracks", &self.remote_tracks.len())
            .finish()
    }
}
