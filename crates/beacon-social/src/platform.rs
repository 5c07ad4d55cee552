//! Seams to the platform: peer connections, capture devices, and the
//! notification/tone/membership collaborators.
//!
//! The call layer never talks to a WebRTC stack or a device API directly.
//! Everything it needs is expressed here, and [`crate::loopback`] provides
//! an in-process implementation for simulations and tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use beacon_common::{Notification, NotificationQueue, SessionId};
use tokio::sync::mpsc;

use crate::alert::AlertSound;
use crate::error::{ConnectionError, MediaAcquisitionError};
use crate::media::{MediaConstraints, MediaStream, MediaTrack, RemoteTrack};
use crate::protocol::IceCandidate;

// ---------------------------------------------------------------------------
// Connection configuration
// ---------------------------------------------------------------------------

/// An ICE server entry (STUN only; no credentials).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceServer {
    pub urls: Vec<String>,
}

/// Settings handed to every new peer connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtcConfiguration {
    pub ice_servers: Vec<IceServer>,
}

impl RtcConfiguration {
    pub fn with_stun_servers<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        let ice_servers = if urls.is_empty() {
            Vec::new()
        } else {
            vec![IceServer { urls }]
        };
        Self { ice_servers }
    }
}

// ---------------------------------------------------------------------------
// Session descriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Opaque id of an outbound sender on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SenderId(pub u32);

// ---------------------------------------------------------------------------
// Peer events
// ---------------------------------------------------------------------------

/// Transport-level connection state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// What a connection reported.
#[derive(Debug, Clone)]
pub enum PeerEventKind {
    LocalCandidate(IceCandidate),
    RemoteTrack(RemoteTrack),
    ConnectionState(ConnectionState),
}

/// A connection callback, tagged with the peer and the session lifetime it
/// belongs to.
#[derive(Debug, Clone)]
pub struct PeerEvent {
    pub peer: String,
    pub session: SessionId,
    pub kind: PeerEventKind,
}

/// Handed to a new connection so it can report callbacks as events.
#[derive(Debug, Clone)]
pub struct PeerEventSink {
    peer: String,
    session: SessionId,
    tx: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerEventSink {
    pub fn new(peer: &str, session: SessionId, tx: mpsc::UnboundedSender<PeerEvent>) -> Self {
        Self {
            peer: peer.to_string(),
            session,
            tx,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Report an event. Dropped silently if the call layer is gone.
    pub fn emit(&self, kind: PeerEventKind) {
        let _ = self.tx.send(PeerEvent {
            peer: self.peer.clone(),
            session: self.session.clone(),
            kind,
        });
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// One end of a direct media connection.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&mut self) -> Result<SessionDescription, ConnectionError>;
    async fn create_answer(&mut self) -> Result<SessionDescription, ConnectionError>;
    async fn set_local_description(
        &mut self,
        desc: SessionDescription,
    ) -> Result<(), ConnectionError>;
    async fn set_remote_description(
        &mut self,
        desc: SessionDescription,
    ) -> Result<(), ConnectionError>;
    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), ConnectionError>;
    fn add_track(&mut self, track: &MediaTrack) -> Result<SenderId, ConnectionError>;
    /// Swap the track on an existing sender without renegotiating.
    async fn replace_track(
        &mut self,
        sender: SenderId,
        track: &MediaTrack,
    ) -> Result<(), ConnectionError>;
    fn close(&mut self);
}

/// Creates peer connections.
pub trait PeerConnectionFactory: Send + Sync {
    fn create(
        &self,
        config: &RtcConfiguration,
        events: PeerEventSink,
    ) -> Result<Box<dyn PeerConnection>, ConnectionError>;
}

/// Camera, microphone and display capture.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, MediaAcquisitionError>;
    async fn display_media(&self) -> Result<MediaStream, MediaAcquisitionError>;
}

/// Desktop / in-app notification façade.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Alert tone façade.
pub trait TonePlayer: Send + Sync {
    fn play(&self, sound: AlertSound);
}

/// Conversation membership lookup.
pub trait MembershipStore: Send + Sync {
    /// Members of a room; empty if the room is unknown.
    fn members(&self, room_id: &str) -> HashSet<String>;
}

impl Notifier for Mutex<NotificationQueue> {
    fn notify(&self, notification: Notification) {
        self.lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(notification);
    }
}

/// Collaborator that does nothing; used where a deployment has no
/// notifications, tones or membership data.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Notifier for Silent {
    fn notify(&self, _notification: Notification) {}
}

impl TonePlayer for Silent {
    fn play(&self, _sound: AlertSound) {}
}

impl MembershipStore for Silent {
    fn members(&self, _room_id: &str) -> HashSet<String> {
        HashSet::new()
    }
}
