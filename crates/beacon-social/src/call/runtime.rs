//! Driving the manager: draining pending inputs, or a long-running loop.

use std::future;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::manager::CallManager;
use super::types::{CallCommand, CallEvent};
use crate::bus::Subscription;
use crate::error::CallError;
use crate::platform::PeerEvent;
use crate::protocol::Envelope;

enum Input {
    Command(CallCommand),
    Envelope(Envelope),
    Peer(PeerEvent),
    ScreenEnded,
}

async fn next_envelope(subscription: Option<&mut Subscription>) -> Option<Envelope> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => future::pending().await,
    }
}

async fn screen_capture_end(ended: Option<watch::Receiver<bool>>) {
    match ended {
        Some(mut rx) => {
            if rx.wait_for(|ended| *ended).await.is_err() {
                future::pending::<()>().await;
            }
        }
        None => future::pending().await,
    }
}

impl CallManager {
    /// Handle every input that is already waiting (peer events, envelopes,
    /// a platform-ended screen capture) without blocking. Returns how many
    /// were handled.
    pub async fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let mut progressed = false;

            while let Ok(event) = self.peer_events_rx.try_recv() {
                progressed = true;
                handled += 1;
                self.process_peer_event(event).await;
            }

            let envelope = self
                .call
                .as_mut()
                .and_then(|c| c.subscription.try_recv());
            if let Some(envelope) = envelope {
                progressed = true;
                handled += 1;
                self.process_envelope(envelope).await;
            }

            if self.media.screen_capture_ended() && self.handle_screen_capture_ended().await {
                progressed = true;
                handled += 1;
            }

            if !progressed {
                return handled;
            }
        }
    }

    /// Run until [`CallCommand::Shutdown`] or until the command channel
    /// closes. Failures are reported as [`CallEvent::Error`].
    pub async fn run(&mut self, mut commands: mpsc::Receiver<CallCommand>) {
        info!(handle = %self.identity.handle, "Call manager running");
        loop {
            let screen = self.media.screen_ended();
            let input = tokio::select! {
                command = commands.recv() => {
                    Input::Command(command.unwrap_or(CallCommand::Shutdown))
                }
                Some(envelope) = next_envelope(self.call.as_mut().map(|c| &mut c.subscription)) => {
                    Input::Envelope(envelope)
                }
                Some(event) = self.peer_events_rx.recv() => Input::Peer(event),
                () = screen_capture_end(screen) => Input::ScreenEnded,
            };

            match input {
                Input::Command(CallCommand::Shutdown) => {
                    if let Err(e) = self.close_room().await {
                        self.report(e);
                    }
                    info!(handle = %self.identity.handle, "Call manager stopped");
                    return;
                }
                Input::Command(command) => self.execute(command).await,
                Input::Envelope(envelope) => self.process_envelope(envelope).await,
                Input::Peer(event) => self.process_peer_event(event).await,
                Input::ScreenEnded => {
                    self.handle_screen_capture_ended().await;
                }
            }
        }
    }

    async fn execute(&mut self, command: CallCommand) {
        debug!(?command, "Executing command");
        let result = match command {
            CallCommand::OpenRoom(room_id) => self.open_room(&room_id).await,
            CallCommand::CloseRoom => self.close_room().await,
            CallCommand::Join => self.join().await,
            CallCommand::Leave => self.leave().await,
            CallCommand::SendText(text) => self.send_text(&text).map(drop),
            CallCommand::TriggerAlert(code) => self.trigger_alert(&code).await.map(drop),
            CallCommand::ToggleTrack(kind) => self.toggle_track(kind).map(drop),
            CallCommand::StartScreenShare => self.start_screen_share().await,
            CallCommand::StopScreenShare => self.stop_screen_share().await.map(drop),
            CallCommand::Shutdown => Ok(()),
        };
        if let Err(e) = result {
            self.report(e);
        }
    }

    async fn process_envelope(&mut self, envelope: Envelope) {
        if let Err(e) = self.handle_envelope(envelope).await {
            self.report(e);
        }
    }

    async fn process_peer_event(&mut self, event: PeerEvent) {
        if let Err(e) = self.handle_peer_event(event).await {
            self.report(e);
        }
    }

    fn report(&self, error: CallError) {
        warn!(error = %error, "Call operation failed");
        self.emit(CallEvent::Error(error.to_string()));
    }
}
