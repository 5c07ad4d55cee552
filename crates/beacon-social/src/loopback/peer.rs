//! Loopback peer connections: synthetic SDP, one host candidate, and
//! remote tracks announced from the remote description.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::trace;

use crate::error::ConnectionError;
use crate::media::{MediaTrack, RemoteTrack, TrackKind};
use crate::platform::{
    ConnectionState, PeerConnection, PeerConnectionFactory, PeerEventKind, PeerEventSink,
    RtcConfiguration, SdpType, SenderId, SessionDescription,
};
use crate::protocol::IceCandidate;

/// Counters shared by every connection a factory created.
#[derive(Debug, Default)]
pub struct LoopbackStats {
    connections: Mutex<HashMap<String, usize>>,
    offers: AtomicUsize,
    answers: AtomicUsize,
    candidates_applied: AtomicUsize,
    replacements: AtomicUsize,
    closed: AtomicUsize,
    answer_faults: AtomicUsize,
}

impl LoopbackStats {
    /// Connections ever created towards `peer`.
    pub fn connections_to(&self, peer: &str) -> usize {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(peer)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_connections(&self) -> usize {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    pub fn offers_created(&self) -> usize {
        self.offers.load(Ordering::Relaxed)
    }

    pub fn answers_created(&self) -> usize {
        self.answers.load(Ordering::Relaxed)
    }

    pub fn candidates_applied(&self) -> usize {
        self.candidates_applied.load(Ordering::Relaxed)
    }

    pub fn replacements(&self) -> usize {
        self.replacements.load(Ordering::Relaxed)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::Relaxed)
    }

    /// Make the next `count` answers fail the way a platform error would.
    pub fn fail_next_answers(&self, count: usize) {
        self.answer_faults.store(count, Ordering::Relaxed);
    }

    fn take_answer_fault(&self) -> bool {
        self.answer_faults
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Creates [`LoopbackPeer`]s.
#[derive(Debug, Default)]
pub struct LoopbackPeerFactory {
    stats: Arc<LoopbackStats>,
}

impl LoopbackPeerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Arc<LoopbackStats> {
        Arc::clone(&self.stats)
    }
}

impl PeerConnectionFactory for LoopbackPeerFactory {
    fn create(
        &self,
        _config: &RtcConfiguration,
        events: PeerEventSink,
    ) -> Result<Box<dyn PeerConnection>, ConnectionError> {
        *self
            .stats
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(events.peer().to_string())
            .or_default() += 1;
        Ok(Box::new(LoopbackPeer::new(events, Arc::clone(&self.stats))))
    }
}

static NEXT_PORT: AtomicU16 = AtomicU16::new(50_000);

#[derive(Debug)]
struct LoopbackSender {
    id: SenderId,
    kind: TrackKind,
    track_id: String,
}

/// An in-process stand-in for a WebRTC peer connection.
#[derive(Debug)]
pub struct LoopbackPeer {
    events: PeerEventSink,
    stats: Arc<LoopbackStats>,
    senders: Vec<LoopbackSender>,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    candidates: Vec<IceCandidate>,
    gathered: bool,
    remote_announced: bool,
    closed: bool,
}

impl LoopbackPeer {
    pub fn new(events: PeerEventSink, stats: Arc<LoopbackStats>) -> Self {
        Self {
            events,
            stats,
            senders: Vec::new(),
            local: None,
            remote: None,
            candidates: Vec::new(),
            gathered: false,
            remote_announced: false,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), ConnectionError> {
        if self.closed {
            Err(ConnectionError::new("connection is closed"))
        } else {
            Ok(())
        }
    }

    fn render_sdp(&self, sdp_type: SdpType) -> String {
        let mut sdp = format!(
            "v=0\r\no=- {} 2 IN IP4 127.0.0.1\r\ns=loopback-{:?}\r\nt=0 0\r\n",
            self.senders.len(),
            sdp_type
        );
        for (mid, sender) in self.senders.iter().enumerate() {
            sdp.push_str(&format!(
                "m={} 9 UDP/TLS/RTP/SAVPF 96\r\na=mid:{mid}\r\na=msid:- {}\r\n",
                sender.kind, sender.track_id
            ));
        }
        sdp
    }

    fn update_connected(&self) {
        if self.local.is_some() && self.remote.is_some() {
            self.events
                .emit(PeerEventKind::ConnectionState(ConnectionState::Connected));
        }
    }
}

/// Remote tracks described by the `m=` lines of an SDP.
fn media_sections(sdp: &str) -> Vec<(TrackKind, String)> {
    let mut sections = Vec::new();
    let mut kind = None;
    for line in sdp.lines() {
        if let Some(rest) = line.strip_prefix("m=") {
            kind = match rest.split_whitespace().next() {
                Some("audio") => Some(TrackKind::Audio),
                Some("video") => Some(TrackKind::Video),
                _ => None,
            };
        } else if let (Some(k), Some(msid)) = (kind, line.strip_prefix("a=msid:- ")) {
            sections.push((k, msid.to_string()));
            kind = None;
        }
    }
    sections
}

#[async_trait]
impl PeerConnection for LoopbackPeer {
    async fn create_offer(&mut self) -> Result<SessionDescription, ConnectionError> {
        self.ensure_open()?;
        self.stats.offers.fetch_add(1, Ordering::Relaxed);
        Ok(SessionDescription::offer(self.render_sdp(SdpType::Offer)))
    }

    async fn create_answer(&mut self) -> Result<SessionDescription, ConnectionError> {
        self.ensure_open()?;
        if self.remote.is_none() {
            return Err(ConnectionError::new("cannot answer without a remote offer"));
        }
        if self.stats.take_answer_fault() {
            return Err(ConnectionError::new("answer generation failed"));
        }
        self.stats.answers.fetch_add(1, Ordering::Relaxed);
        Ok(SessionDescription::answer(self.render_sdp(SdpType::Answer)))
    }

    async fn set_local_description(
        &mut self,
        desc: SessionDescription,
    ) -> Result<(), ConnectionError> {
        self.ensure_open()?;
        self.local = Some(desc);
        if !self.gathered {
            self.gathered = true;
            self.events
                .emit(PeerEventKind::ConnectionState(ConnectionState::Connecting));
            let port = NEXT_PORT.fetch_add(1, Ordering::Relaxed);
            self.events.emit(PeerEventKind::LocalCandidate(IceCandidate {
                candidate: format!("candidate:1 1 udp 2122260223 127.0.0.1 {port} typ host"),
                sdp_mid: Some("0".into()),
                sdp_m_line_index: Some(0),
            }));
        }
        self.update_connected();
        Ok(())
    }

    async fn set_remote_description(
        &mut self,
        desc: SessionDescription,
    ) -> Result<(), ConnectionError> {
        self.ensure_open()?;
        if !self.remote_announced {
            self.remote_announced = true;
            for (kind, id) in media_sections(&desc.sdp) {
                self.events
                    .emit(PeerEventKind::RemoteTrack(RemoteTrack { id, kind }));
            }
        }
        self.remote = Some(desc);
        self.update_connected();
        Ok(())
    }

    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), ConnectionError> {
        self.ensure_open()?;
        if self.remote.is_none() {
            return Err(ConnectionError::new("no remote description"));
        }
        if self.candidates.contains(&candidate) {
            return Err(ConnectionError::new("duplicate candidate"));
        }
        trace!(candidate = %candidate.candidate, "Loopback candidate added");
        self.candidates.push(candidate);
        self.stats.candidates_applied.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn add_track(&mut self, track: &MediaTrack) -> Result<SenderId, ConnectionError> {
        self.ensure_open()?;
        let id = SenderId(self.senders.len() as u32);
        self.senders.push(LoopbackSender {
            id,
            kind: track.kind(),
            track_id: track.id().to_string(),
        });
        Ok(id)
    }

    async fn replace_track(
        &mut self,
        sender: SenderId,
        track: &MediaTrack,
    ) -> Result<(), ConnectionError> {
        self.ensure_open()?;
        let Some(slot) = self.senders.iter_mut().find(|s| s.id == sender) else {
            return Err(ConnectionError::new(format!("unknown sender {}", sender.0)));
        };
        if slot.kind != track.kind() {
            return Err(ConnectionError::new(format!(
                "cannot send {} on a {} sender",
                track.kind(),
                slot.kind
            )));
        }
        slot.track_id = track.id().to_string();
        self.stats.replacements.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.stats.closed.fetch_add(1, Ordering::Relaxed);
            self.events
                .emit(PeerEventKind::ConnectionState(ConnectionState::Closed));
        }
    }
}
