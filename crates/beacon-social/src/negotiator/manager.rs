//! Per-room negotiator: one [`Session`] per remote peer.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use beacon_common::SessionId;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::session::{DescriptionOp, OutboundSender, Session, SessionState, SignalingState};
use crate::error::{CallError, ConnectionError, IgnoreReason};
use crate::media::{MediaTrack, RemoteTrack, TrackKind};
use crate::platform::{
    ConnectionState, PeerConnection, PeerConnectionFactory, PeerEvent, PeerEventSink,
    RtcConfiguration, SessionDescription,
};
use crate::protocol::{IceCandidate, Signal, SignalPayload};

/// What became of an inbound signal.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    /// Publish this reply (an answer to an offer).
    Reply(SignalPayload),
    /// Applied; nothing to send.
    Applied,
    Ignored(IgnoreReason),
}

/// Drives offer/answer/ICE for every peer in one room.
///
/// The negotiator never publishes anything itself: it returns the signals
/// to send and the caller puts them on the bus.
pub struct Negotiator {
    local_handle: String,
    room_id: String,
    rtc: RtcConfiguration,
    factory: Arc<dyn PeerConnectionFactory>,
    sessions: HashMap<String, Session>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
}

impl Negotiator {
    pub fn new(
        local_handle: &str,
        room_id: &str,
        rtc: RtcConfiguration,
        factory: Arc<dyn PeerConnectionFactory>,
        events_tx: mpsc::UnboundedSender<PeerEvent>,
    ) -> Self {
        Self {
            local_handle: local_handle.to_string(),
            room_id: room_id.to_string(),
            rtc,
            factory,
            sessions: HashMap::new(),
            events_tx,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Get or create the session for `peer`. A new session gets a fresh
    /// connection with `outbound` attached; an existing one is returned
    /// untouched.
    pub fn ensure(&mut self, peer: &str, outbound: &[MediaTrack]) -> Result<&Session, CallError> {
        match self.sessions.entry(peer.to_string()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let id = SessionId::new();
                let sink = PeerEventSink::new(peer, id.clone(), self.events_tx.clone());
                let mut connection = self
                    .factory
                    .create(&self.rtc, sink)
                    .map_err(|e| CallError::connection(peer, e))?;

                let mut senders = HashMap::new();
                for track in outbound {
                    if senders.contains_key(&track.kind()) {
                        continue;
                    }
                    let sender = connection
                        .add_track(track)
                        .map_err(|e| CallError::connection(peer, e))?;
                    senders.insert(
                        track.kind(),
                        OutboundSender {
                            id: sender,
                            track_id: track.id().to_string(),
                        },
                    );
                }

                info!(
                    room_id = %self.room_id,
                    peer,
                    session = %id,
                    tracks = senders.len(),
                    "Session created"
                );
                Ok(&*entry.insert(Session {
                    id,
                    peer: peer.to_string(),
                    state: SessionState::Connecting,
                    signaling: SignalingState::Stable,
                    connection_state: ConnectionState::New,
                    connection,
                    senders,
                    remote_tracks: Vec::new(),
                }))
            }
        }
    }

    /// Create an offer for `peer`. A no-op (returns `None`) if there is no
    /// session or an exchange is already in flight.
    pub async fn make_offer(&mut self, peer: &str) -> Result<Option<SignalPayload>, CallError> {
        let Some(session) = self.sessions.get_mut(peer) else {
            debug!(peer, "No session to offer on");
            return Ok(None);
        };
        if session.signaling != SignalingState::Stable {
            debug!(peer, signaling = ?session.signaling, "Offer skipped; exchange in flight");
            return Ok(None);
        }

        let offer = session
            .connection
            .create_offer()
            .await
            .map_err(|e| CallError::connection(peer, e))?;
        session
            .connection
            .set_local_description(offer.clone())
            .await
            .map_err(|e| CallError::connection(peer, e))?;
        session.signaling = SignalingState::HaveLocalOffer;

        info!(room_id = %self.room_id, peer, "Sending offer");
        Ok(Some(self.signal_to(peer, Signal::Offer { sdp: offer.sdp })))
    }

    /// Whether a signal is for this room and this handle.
    pub fn is_addressed_to_us(&self, payload: &SignalPayload) -> bool {
        payload.room_id == self.room_id && payload.to == self.local_handle
    }

    /// Apply an inbound signal. Offers create the session if needed,
    /// attaching `outbound`.
    pub async fn handle_signal(
        &mut self,
        payload: &SignalPayload,
        outbound: &[MediaTrack],
    ) -> Result<SignalOutcome, CallError> {
        if !self.is_addressed_to_us(payload) {
            debug!(
                room_id = %payload.room_id,
                to = %payload.to,
                kind = payload.signal.name(),
                "Signal not for us"
            );
            return Ok(SignalOutcome::Ignored(IgnoreReason::StaleSignal));
        }

        let peer = payload.from.as_str();
        match &payload.signal {
            Signal::Offer { sdp } => self.accept_offer(peer, sdp, outbound).await,
            Signal::Answer { sdp } => self.accept_answer(peer, sdp).await,
            Signal::Ice { candidate } => Ok(self.add_candidate(peer, candidate.clone()).await),
        }
    }

    async fn accept_offer(
        &mut self,
        peer: &str,
        sdp: &str,
        outbound: &[MediaTrack],
    ) -> Result<SignalOutcome, CallError> {
        self.ensure(peer, outbound)?;
        let Some(session) = self.sessions.get_mut(peer) else {
            return Ok(SignalOutcome::Ignored(IgnoreReason::StaleSignal));
        };
        if let Err(reason) = session.signaling.apply(DescriptionOp::RemoteOffer) {
            debug!(peer, signaling = ?session.signaling, "Offer conflicts with local state");
            return Ok(SignalOutcome::Ignored(reason));
        }

        session
            .connection
            .set_remote_description(SessionDescription::offer(sdp))
            .await
            .map_err(|e| CallError::connection(peer, e))?;
        session.signaling = SignalingState::HaveRemoteOffer;

        let answer = match local_answer(session.connection.as_mut()).await {
            Ok(answer) => answer,
            Err(e) => {
                // Back to stable so the peer's next offer is accepted.
                session.signaling = SignalingState::Stable;
                warn!(peer, error = %e, "Could not answer offer");
                return Err(CallError::connection(peer, e));
            }
        };
        if let Err(reason) = session.advance(DescriptionOp::LocalAnswer) {
            return Ok(SignalOutcome::Ignored(reason));
        }

        info!(room_id = %self.room_id, peer, "Answering offer");
        Ok(SignalOutcome::Reply(
            self.signal_to(peer, Signal::Answer { sdp: answer.sdp }),
        ))
    }

    async fn accept_answer(&mut self, peer: &str, sdp: &str) -> Result<SignalOutcome, CallError> {
        let Some(session) = self.sessions.get_mut(peer) else {
            debug!(peer, "Answer for unknown session");
            return Ok(SignalOutcome::Ignored(IgnoreReason::StaleSignal));
        };
        if let Err(reason) = session.signaling.apply(DescriptionOp::RemoteAnswer) {
            debug!(peer, signaling = ?session.signaling, "Unexpected answer");
            return Ok(SignalOutcome::Ignored(reason));
        }

        session
            .connection
            .set_remote_description(SessionDescription::answer(sdp))
            .await
            .map_err(|e| CallError::connection(peer, e))?;
        if let Err(reason) = session.advance(DescriptionOp::RemoteAnswer) {
            return Ok(SignalOutcome::Ignored(reason));
        }
        debug!(peer, "Answer applied");
        Ok(SignalOutcome::Applied)
    }

    async fn add_candidate(&mut self, peer: &str, candidate: IceCandidate) -> SignalOutcome {
        let Some(session) = self.sessions.get_mut(peer) else {
            debug!(peer, "Candidate for unknown session");
            return SignalOutcome::Ignored(IgnoreReason::CandidateApplicationFailure);
        };
        match session.connection.add_ice_candidate(candidate).await {
            Ok(()) => SignalOutcome::Applied,
            Err(e) => {
                debug!(peer, error = %e, "Candidate rejected");
                SignalOutcome::Ignored(IgnoreReason::CandidateApplicationFailure)
            }
        }
    }

    /// An `ice` signal for a locally gathered candidate.
    pub fn candidate_signal(&self, peer: &str, candidate: IceCandidate) -> SignalPayload {
        self.signal_to(peer, Signal::Ice { candidate })
    }

    fn signal_to(&self, peer: &str, signal: Signal) -> SignalPayload {
        SignalPayload {
            room_id: self.room_id.clone(),
            to: peer.to_string(),
            from: self.local_handle.clone(),
            signal,
        }
    }

    /// Whether `session` is the live session for `peer`.
    pub fn is_current(&self, peer: &str, session: &SessionId) -> bool {
        self.sessions.get(peer).is_some_and(|s| &s.id == session)
    }

    pub fn attach_remote_track(&mut self, peer: &str, track: RemoteTrack) -> bool {
        let Some(session) = self.sessions.get_mut(peer) else {
            return false;
        };
        if session.remote_tracks.iter().any(|t| t.id == track.id) {
            return false;
        }
        session.remote_tracks.push(track);
        true
    }

    pub fn set_connection_state(&mut self, peer: &str, state: ConnectionState) {
        if let Some(session) = self.sessions.get_mut(peer) {
            session.connection_state = state;
        }
    }

    /// Swap the outbound track of `kind` on every session that has a
    /// sender for it. Returns how many sessions were updated.
    pub async fn replace_outbound(&mut self, kind: TrackKind, track: &MediaTrack) -> usize {
        let mut replaced = 0;
        for session in self.sessions.values_mut() {
            let Some(sender) = session.senders.get_mut(&kind) else {
                debug!(peer = %session.peer, %kind, "No sender; replacement skipped");
                continue;
            };
            match session.connection.replace_track(sender.id, track).await {
                Ok(()) => {
                    sender.track_id = track.id().to_string();
                    replaced += 1;
                }
                Err(e) => warn!(peer = %session.peer, %kind, error = %e, "Track replacement failed"),
            }
        }
        replaced
    }

    /// Tear down the session for `peer`. Returns `false` if there was none.
    pub fn close(&mut self, peer: &str) -> bool {
        match self.sessions.remove(peer) {
            Some(mut session) => {
                session.close();
                info!(room_id = %self.room_id, peer, "Session closed");
                true
            }
            None => false,
        }
    }

    /// Tear down every session. Returns the peers that had one.
    pub fn close_all(&mut self) -> Vec<String> {
        let mut peers: Vec<String> = self.sessions.keys().cloned().collect();
        peers.sort();
        for peer in &peers {
            self.close(peer);
        }
        peers
    }

    pub fn session(&self, peer: &str) -> Option<&Session> {
        self.sessions.get(peer)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Peers with a session, sorted.
    pub fn peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.sessions.keys().cloned().collect();
        peers.sort();
        peers
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Create an answer and apply it locally.
async fn local_answer(
    connection: &mut dyn PeerConnection,
) -> Result<SessionDescription, ConnectionError> {
    let answer = connection.create_answer().await?;
    connection.set_local_description(answer.clone()).await?;
    Ok(answer)
}

impl std::fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiator")
            .field("local_handle", &self.local_handle)
            .field("room_id", &self.room_id)
            .field("sessions", &self.sessions)
            .finish()
    }
}
