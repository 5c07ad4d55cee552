//! Inbound dispatch: envelopes from the bus and events from connections.

use beacon_common::Notification;
use tracing::{debug, info, warn};

use super::manager::CallManager;
use super::types::{CallEvent, CallPhase};
use crate::alert::AlertMode;
use crate::chat::{Message, MessageBody};
use crate::error::{CallError, Dispatch, IgnoreReason};
use crate::negotiator::SignalOutcome;
use crate::platform::{ConnectionState, PeerEvent, PeerEventKind};
use crate::presence::PresenceTransition;
use crate::protocol::{Envelope, PresencePayload, Signal, SignalPayload};

fn ignored(reason: IgnoreReason) -> Dispatch {
    debug!(?reason, "Input ignored");
    Dispatch::Ignored(reason)
}

impl CallManager {
    /// Handle one envelope from the room bus.
    pub async fn handle_envelope(&mut self, envelope: Envelope) -> Result<Dispatch, CallError> {
        let Some(call) = self.call.as_ref() else {
            return Ok(ignored(IgnoreReason::NoActiveRoom));
        };
        let sender = envelope.sender_handle();
        if sender == self.identity.handle {
            return Ok(ignored(IgnoreReason::SelfMessage));
        }
        let members = self.backends.membership.members(&call.room_id);
        if !members.is_empty() && !members.contains(sender) {
            debug!(room_id = %call.room_id, sender, "Sender is not a room member");
            return Ok(ignored(IgnoreReason::NotAMember));
        }
        debug!(room_id = %call.room_id, sender, kind = ?envelope.kind(), "Dispatching envelope");

        match envelope {
            Envelope::ChatMessage { payload, .. } => Ok(self.on_chat(payload)),
            Envelope::CallSignal { payload, .. } => self.on_signal(payload).await,
            Envelope::CallPresence { payload, .. } => self.on_presence(payload).await,
        }
    }

    fn on_chat(&mut self, message: Message) -> Dispatch {
        let Some(room_id) = self.room_id().map(str::to_string) else {
            return ignored(IgnoreReason::NoActiveRoom);
        };
        self.history.push(&room_id, message.clone());
        self.emit(CallEvent::MessageReceived {
            room_id: room_id.clone(),
            message: message.clone(),
        });

        match &message.body {
            MessageBody::Text { text } => {
                self.backends
                    .notifier
                    .notify(Notification::message(&room_id, &message.from_name, text));
            }
            MessageBody::Alert {
                code_name,
                mode,
                color,
                sound,
                text,
            } => {
                info!(room_id = %room_id, from = %message.from, code = %code_name, "Alert received");
                self.backends
                    .notifier
                    .notify(Notification::alert(&room_id, code_name, text, color));
                self.backends.tones.play(*sound);
                if *mode == AlertMode::Call && self.phase() == CallPhase::Idle {
                    self.backends
                        .notifier
                        .notify(Notification::call_invite(&room_id, &message.from_name));
                    self.emit(CallEvent::CallInvite {
                        room_id,
                        from: message.from.clone(),
                    });
                }
            }
        }
        Dispatch::Handled
    }

    async fn on_presence(&mut self, payload: PresencePayload) -> Result<Dispatch, CallError> {
        let Some(call) = self.call.as_mut() else {
            return Ok(ignored(IgnoreReason::NoActiveRoom));
        };
        let transition = match call.presence.on_presence(&payload) {
            Ok(t) => t,
            Err(reason) => return Ok(ignored(reason)),
        };
        let room_id = call.room_id.clone();
        let peer = payload.handle;

        match transition {
            PresenceTransition::Unchanged => Ok(ignored(IgnoreReason::DuplicatePresence)),
            PresenceTransition::Join => {
                info!(room_id = %room_id, peer = %peer, "Peer is in call");
                self.emit(CallEvent::PeerJoined {
                    room_id,
                    peer: peer.clone(),
                });
                if self.phase().in_call() {
                    // The bus has no replay: answer a newcomer with our own
                    // state so it learns about us too.
                    self.announce(true);
                    self.connect_peer(&peer).await?;
                }
                Ok(Dispatch::Handled)
            }
            PresenceTransition::Leave => {
                info!(room_id = %room_id, peer = %peer, "Peer left the call");
                let closed = self
                    .call
                    .as_mut()
                    .is_some_and(|c| c.negotiator.close(&peer));
                self.emit(CallEvent::PeerLeft {
                    room_id,
                    peer: peer.clone(),
                });
                if closed {
                    self.emit(CallEvent::RemoteMediaClosed { peer });
                }
                Ok(Dispatch::Handled)
            }
        }
    }

    async fn on_signal(&mut self, payload: SignalPayload) -> Result<Dispatch, CallError> {
        let Some(call) = self.call.as_ref() else {
            return Ok(ignored(IgnoreReason::NoActiveRoom));
        };
        if !call.negotiator.is_addressed_to_us(&payload) {
            debug!(
                room_id = %payload.room_id,
                to = %payload.to,
                kind = payload.signal.name(),
                "Signal not for us"
            );
            return Ok(ignored(IgnoreReason::StaleSignal));
        }

        if matches!(payload.signal, Signal::Offer { .. }) && self.phase() == CallPhase::Idle {
            info!(peer = %payload.from, "Offer while idle; joining the call");
            self.join().await?;
        }

        let outbound = self.media.outbound_tracks();
        let Some(call) = self.call.as_mut() else {
            return Ok(ignored(IgnoreReason::NoActiveRoom));
        };
        match call.negotiator.handle_signal(&payload, &outbound).await? {
            SignalOutcome::Reply(reply) => {
                call.subscription
                    .publish(Envelope::signal(&self.identity.handle, reply));
                Ok(Dispatch::Handled)
            }
            SignalOutcome::Applied => Ok(Dispatch::Handled),
            SignalOutcome::Ignored(reason) => Ok(ignored(reason)),
        }
    }

    /// Handle one callback reported by a peer connection.
    pub async fn handle_peer_event(&mut self, event: PeerEvent) -> Result<Dispatch, CallError> {
        let Some(call) = self.call.as_mut() else {
            return Ok(ignored(IgnoreReason::NoActiveRoom));
        };
        if !call.negotiator.is_current(&event.peer, &event.session) {
            debug!(peer = %event.peer, session = %event.session, "Event from a closed session");
            return Ok(ignored(IgnoreReason::StaleSignal));
        }

        match event.kind {
            PeerEventKind::LocalCandidate(candidate) => {
                let signal = call.negotiator.candidate_signal(&event.peer, candidate);
                call.subscription
                    .publish(Envelope::signal(&self.identity.handle, signal));
            }
            PeerEventKind::RemoteTrack(track) => {
                let attached = call.negotiator.attach_remote_track(&event.peer, track.clone());
                if attached {
                    debug!(peer = %event.peer, kind = %track.kind, "Remote track attached");
                    self.emit(CallEvent::RemoteTrack {
                        peer: event.peer,
                        track,
                    });
                }
            }
            PeerEventKind::ConnectionState(state) => {
                call.negotiator.set_connection_state(&event.peer, state);
                match state {
                    ConnectionState::Failed => {
                        warn!(peer = %event.peer, "Peer connection failed");
                    }
                    ConnectionState::Connected => {
                        info!(peer = %event.peer, "Peer connected");
                    }
                    _ => debug!(peer = %event.peer, ?state, "Connection state changed"),
                }
            }
        }
        Ok(Dispatch::Handled)
    }

    /// The platform ended the screen capture: put the camera back. Returns
    /// `false` if there was nothing to restore.
    pub async fn handle_screen_capture_ended(&mut self) -> bool {
        if !self.media.screen_capture_ended() {
            return false;
        }
        let Some(call) = self.call.as_mut() else {
            self.media.release_all();
            return false;
        };
        info!(room_id = %call.room_id, "Screen capture ended by the platform");
        let stopped = self.media.stop_screen_share(&mut call.negotiator).await;
        if stopped {
            self.emit(CallEvent::ScreenShareStopped);
        }
        stopped
    }
}
