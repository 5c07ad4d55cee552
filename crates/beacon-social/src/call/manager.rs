//! Call manager: room lifecycle, join/leave, local actions.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};

use super::types::{CallBackends, CallConfig, CallEvent, CallPhase};
use crate::alert::{AlertCode, AlertMode};
use crate::bus::{ChannelBus, Subscription};
use crate::chat::{ChatHistory, Message};
use crate::error::CallError;
use crate::identity::Identity;
use crate::media::{MediaController, TrackKind};
use crate::negotiator::{should_offer, Negotiator};
use crate::platform::{PeerEvent, RtcConfiguration};
use crate::presence::PresenceRegistry;
use crate::protocol::Envelope;

// ---------------------------------------------------------------------------
// Room state
// ---------------------------------------------------------------------------

/// Everything tied to the open room.
pub(super) struct CallState {
    pub(super) room_id: String,
    pub(super) subscription: Subscription,
    pub(super) phase: CallPhase,
    pub(super) presence: PresenceRegistry,
    pub(super) negotiator: Negotiator,
}

// ---------------------------------------------------------------------------
// Call Manager
// ---------------------------------------------------------------------------

/// Coordinates chat, presence and calls for one local identity.
///
/// At most one room is open at a time. The manager is driven through
/// `&mut self`, so inputs are handled strictly one after another; use
/// [`CallManager::pump`] to drain pending inputs or [`CallManager::run`] to
/// drive it from a command channel.
pub struct CallManager {
    pub(super) identity: Identity,
    pub(super) bus: ChannelBus,
    pub(super) backends: CallBackends,
    pub(super) rtc: RtcConfiguration,
    pub(super) media: MediaController,
    pub(super) history: ChatHistory,
    pub(super) call: Option<CallState>,
    pub(super) peer_events_tx: mpsc::UnboundedSender<PeerEvent>,
    pub(super) peer_events_rx: mpsc::UnboundedReceiver<PeerEvent>,
    event_tx: mpsc::Sender<CallEvent>,
}

impl CallManager {
    pub fn new(
        identity: Identity,
        config: CallConfig,
        bus: ChannelBus,
        backends: CallBackends,
    ) -> (Self, mpsc::Receiver<CallEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let (peer_events_tx, peer_events_rx) = mpsc::unbounded_channel();
        let mgr = Self {
            rtc: RtcConfiguration::with_stun_servers(config.stun_servers),
            media: MediaController::new(Arc::clone(&backends.devices), config.constraints),
            history: ChatHistory::new(config.history),
            identity,
            bus,
            backends,
            call: None,
            peer_events_tx,
            peer_events_rx,
            event_tx,
        };
        (mgr, event_rx)
    }

    // -- Accessors ----------------------------------------------------------

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn room_id(&self) -> Option<&str> {
        self.call.as_ref().map(|c| c.room_id.as_str())
    }

    /// Current phase; `Idle` when no room is open.
    pub fn phase(&self) -> CallPhase {
        self.call.as_ref().map(|c| c.phase).unwrap_or_default()
    }

    pub fn presence(&self) -> Option<&PresenceRegistry> {
        self.call.as_ref().map(|c| &c.presence)
    }

    pub fn negotiator(&self) -> Option<&Negotiator> {
        self.call.as_ref().map(|c| &c.negotiator)
    }

    pub fn media(&self) -> &MediaController {
        &self.media
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    // -- Rooms --------------------------------------------------------------

    /// Subscribe to a room. Any other open room is closed first, leaving
    /// its call.
    pub async fn open_room(&mut self, room_id: &str) -> Result<(), CallError> {
        if self.room_id() == Some(room_id) {
            return Ok(());
        }
        self.close_room().await?;

        let subscription = self.bus.subscribe(room_id);
        let negotiator = Negotiator::new(
            &self.identity.handle,
            room_id,
            self.rtc.clone(),
            Arc::clone(&self.backends.factory),
            self.peer_events_tx.clone(),
        );
        self.call = Some(CallState {
            room_id: room_id.to_string(),
            subscription,
            phase: CallPhase::Idle,
            presence: PresenceRegistry::new(room_id, &self.identity.handle),
            negotiator,
        });

        info!(room_id, handle = %self.identity.handle, "Room opened");
        self.emit(CallEvent::RoomOpened {
            room_id: room_id.to_string(),
        });
        Ok(())
    }

    /// Leave the call if needed and unsubscribe from the room.
    pub async fn close_room(&mut self) -> Result<(), CallError> {
        if self.call.is_none() {
            return Ok(());
        }
        self.leave().await?;
        if let Some(call) = self.call.take() {
            info!(room_id = %call.room_id, "Room closed");
            self.emit(CallEvent::RoomClosed {
                room_id: call.room_id,
            });
        }
        Ok(())
    }

    // -- Join / leave -------------------------------------------------------

    /// Acquire media, announce ourselves and connect to every peer already
    /// in call. Any failure leaves the manager idle with media released.
    pub async fn join(&mut self) -> Result<(), CallError> {
        let phase = self.phase();
        if self.call.is_none() {
            return Err(CallError::NoActiveRoom);
        }
        if phase != CallPhase::Idle {
            return Err(CallError::InvalidTransition {
                action: "join",
                phase,
            });
        }

        if let Err(e) = self.media.acquire_local_media().await {
            warn!(error = %e, "Join aborted: media unavailable");
            self.media.release_all();
            return Err(e.into());
        }

        self.set_phase(CallPhase::Joining);
        self.announce(true);

        let peers = self
            .call
            .as_ref()
            .map(|c| c.presence.in_call_peers())
            .unwrap_or_default();
        for peer in &peers {
            if let Err(e) = self.connect_peer(peer).await {
                warn!(peer = %peer, error = %e, "Join aborted");
                self.teardown();
                return Err(e);
            }
        }

        self.set_phase(CallPhase::Active);
        info!(
            room_id = self.room_id().unwrap_or_default(),
            peers = peers.len(),
            "Joined call"
        );
        Ok(())
    }

    /// Announce departure, close every session and release media. A no-op
    /// while idle.
    pub async fn leave(&mut self) -> Result<(), CallError> {
        if self.phase() == CallPhase::Idle {
            return Ok(());
        }
        self.teardown();
        info!(room_id = self.room_id().unwrap_or_default(), "Left call");
        Ok(())
    }

    fn teardown(&mut self) {
        self.set_phase(CallPhase::Leaving);
        let mut closed = Vec::new();
        if let Some(call) = self.call.as_mut() {
            call.presence.announce(&call.subscription, false);
            closed = call.negotiator.close_all();
        }
        for peer in closed {
            self.emit(CallEvent::RemoteMediaClosed { peer });
        }
        self.media.release_all();
        self.set_phase(CallPhase::Idle);
    }

    /// Ensure a session with `peer` and offer if we win the election.
    pub(super) async fn connect_peer(&mut self, peer: &str) -> Result<(), CallError> {
        let outbound = self.media.outbound_tracks();
        let Some(call) = self.call.as_mut() else {
            return Err(CallError::NoActiveRoom);
        };
        call.negotiator.ensure(peer, &outbound)?;
        if should_offer(&self.identity.handle, peer) {
            if let Some(offer) = call.negotiator.make_offer(peer).await? {
                call.subscription
                    .publish(Envelope::signal(&self.identity.handle, offer));
            }
        }
        Ok(())
    }

    pub(super) fn announce(&mut self, in_call: bool) {
        if let Some(call) = self.call.as_mut() {
            call.presence.announce(&call.subscription, in_call);
        }
    }

    fn set_phase(&mut self, phase: CallPhase) {
        let Some(call) = self.call.as_mut() else {
            return;
        };
        if call.phase == phase {
            return;
        }
        call.phase = phase;
        let room_id = call.room_id.clone();
        info!(room_id = %room_id, %phase, "Call phase changed");
        self.emit(CallEvent::PhaseChanged { room_id, phase });
    }

    fn require_active(&self, action: &'static str) -> Result<(), CallError> {
        match self.call.as_ref().map(|c| c.phase) {
            None => Err(CallError::NoActiveRoom),
            Some(CallPhase::Active) => Ok(()),
            Some(phase) => Err(CallError::InvalidTransition { action, phase }),
        }
    }

    // -- Media --------------------------------------------------------------

    /// Mute or unmute the local track of `kind`. Returns the new state.
    pub fn toggle_track(&mut self, kind: TrackKind) -> Result<bool, CallError> {
        self.require_active("toggle a track")?;
        let enabled = self
            .media
            .toggle_track(kind)
            .ok_or(CallError::MissingTrack(kind))?;
        self.emit(CallEvent::TrackToggled { kind, enabled });
        Ok(enabled)
    }

    pub async fn start_screen_share(&mut self) -> Result<(), CallError> {
        self.require_active("share the screen")?;
        let Some(call) = self.call.as_mut() else {
            return Err(CallError::NoActiveRoom);
        };
        if self.media.is_sharing() {
            return Ok(());
        }
        self.media.start_screen_share(&mut call.negotiator).await?;
        self.emit(CallEvent::ScreenShareStarted);
        Ok(())
    }

    /// Returns `false` if no share was running.
    pub async fn stop_screen_share(&mut self) -> Result<bool, CallError> {
        self.require_active("stop sharing")?;
        let Some(call) = self.call.as_mut() else {
            return Err(CallError::NoActiveRoom);
        };
        let stopped = self.media.stop_screen_share(&mut call.negotiator).await;
        if stopped {
            self.emit(CallEvent::ScreenShareStopped);
        }
        Ok(stopped)
    }

    // -- Messages -----------------------------------------------------------

    /// Post a text message to the open room.
    pub fn send_text(&mut self, text: &str) -> Result<Message, CallError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CallError::EmptyMessage);
        }
        let message = Message::text(&self.identity, text);
        self.publish_message(message)
    }

    /// Post an alert. A call-mode code also joins the call when idle; the
    /// message goes out first, so it is delivered even if the join fails.
    pub async fn trigger_alert(&mut self, code: &AlertCode) -> Result<Message, CallError> {
        let message = self.publish_message(Message::alert(&self.identity, code))?;
        info!(
            room_id = self.room_id().unwrap_or_default(),
            code = %code.name,
            mode = ?code.mode,
            "Alert triggered"
        );
        if code.mode == AlertMode::Call && self.phase() == CallPhase::Idle {
            self.join().await?;
        }
        Ok(message)
    }

    fn publish_message(&mut self, message: Message) -> Result<Message, CallError> {
        let Some(call) = self.call.as_ref() else {
            return Err(CallError::NoActiveRoom);
        };
        call.subscription
            .publish(Envelope::chat(&self.identity.handle, message.clone()));
        let room_id = call.room_id.clone();
        self.history.push(&room_id, message.clone());
        Ok(message)
    }

    // -- Events -------------------------------------------------------------

    /// Send an event to the UI. Dropped with a warning if the channel is
    /// full, silently if nobody listens.
    pub(super) fn emit(&self, event: CallEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "Call event channel full; event dropped");
            }
        }
    }
}

impl std::fmt::Debug for CallManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallManager")
            .field("handle", &self.identity.handle)
            .field("room_id", &self.room_id())
            .field("phase", &self.phase())
            .finish()
    }
}
