//! Local capture streams and the outbound track set.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use super::types::{MediaConstraints, MediaStream, MediaTrack, TrackKind};
use crate::error::{CaptureSource, MediaAcquisitionError};
use crate::negotiator::Negotiator;
use crate::platform::MediaDevices;

/// Owns the camera/microphone stream and the optional screen capture.
pub struct MediaController {
    devices: Arc<dyn MediaDevices>,
    constraints: MediaConstraints,
    local: Option<MediaStream>,
    screen: Option<MediaStream>,
    preview: Option<MediaStream>,
}

impl MediaController {
    pub fn new(devices: Arc<dyn MediaDevices>, constraints: MediaConstraints) -> Self {
        Self {
            devices,
            constraints,
            local: None,
            screen: None,
            preview: None,
        }
    }

    /// Camera and microphone, captured once and reused until released.
    pub async fn acquire_local_media(&mut self) -> Result<&MediaStream, MediaAcquisitionError> {
        let reusable = self
            .local
            .as_ref()
            .is_some_and(|s| !s.tracks.iter().all(MediaTrack::is_ended));
        if !reusable {
            let stream = self.devices.user_media(self.constraints).await?;
            info!(stream = %stream.id, tracks = stream.tracks.len(), "Local media acquired");
            self.preview = Some(stream.clone());
            self.local = Some(stream);
        }
        self.local
            .as_ref()
            .ok_or(MediaAcquisitionError::NoDevice(CaptureSource::CameraAndMicrophone))
    }

    pub fn local_stream(&self) -> Option<&MediaStream> {
        self.local.as_ref()
    }

    /// What we currently send: local audio, plus the screen video while
    /// sharing or the camera video otherwise.
    pub fn outbound_tracks(&self) -> Vec<MediaTrack> {
        let mut tracks = Vec::new();
        if let Some(audio) = self.local.as_ref().and_then(|s| s.first(TrackKind::Audio)) {
            tracks.push(audio.clone());
        }
        let video = self
            .screen
            .as_ref()
            .and_then(|s| s.first(TrackKind::Video))
            .or_else(|| self.local.as_ref().and_then(|s| s.first(TrackKind::Video)));
        if let Some(video) = video {
            tracks.push(video.clone());
        }
        tracks
    }

    /// Flip the first local track of `kind`. Returns the new state, or
    /// `None` if there is no such track.
    pub fn toggle_track(&self, kind: TrackKind) -> Option<bool> {
        let track = self.local.as_ref()?.first(kind)?;
        let enabled = !track.is_enabled();
        track.set_enabled(enabled);
        debug!(%kind, enabled, "Track toggled");
        Some(enabled)
    }

    pub fn is_sharing(&self) -> bool {
        self.screen.is_some()
    }

    /// Start display capture and send it instead of the camera on every
    /// session. No-op if already sharing.
    pub async fn start_screen_share(
        &mut self,
        negotiator: &mut Negotiator,
    ) -> Result<(), MediaAcquisitionError> {
        if self.screen.is_some() {
            return Ok(());
        }
        let stream = self.devices.display_media().await?;
        let Some(video) = stream.first(TrackKind::Video).cloned() else {
            stream.stop_all();
            return Err(MediaAcquisitionError::NoDevice(CaptureSource::Display));
        };

        let replaced = negotiator.replace_outbound(TrackKind::Video, &video).await;
        let mut preview = vec![video];
        if let Some(audio) = self.local.as_ref().and_then(|s| s.first(TrackKind::Audio)) {
            preview.push(audio.clone());
        }
        self.preview = Some(MediaStream::new(format!("{}-preview", stream.id), preview));
        info!(stream = %stream.id, sessions = replaced, "Screen share started");
        self.screen = Some(stream);
        Ok(())
    }

    /// Stop the display capture and put the camera back on every session.
    /// Returns `false` if no share was running.
    pub async fn stop_screen_share(&mut self, negotiator: &mut Negotiator) -> bool {
        let Some(screen) = self.screen.take() else {
            return false;
        };
        screen.stop_all();

        let camera = self
            .local
            .as_ref()
            .and_then(|s| s.first(TrackKind::Video))
            .cloned();
        let restored = match &camera {
            Some(camera) => negotiator.replace_outbound(TrackKind::Video, camera).await,
            None => 0,
        };
        self.preview = self.local.clone();
        info!(stream = %screen.id, sessions = restored, "Screen share stopped");
        true
    }

    /// Whether the platform ended the screen capture on its own.
    pub fn screen_capture_ended(&self) -> bool {
        self.screen
            .as_ref()
            .and_then(|s| s.first(TrackKind::Video))
            .is_some_and(MediaTrack::is_ended)
    }

    /// Watch for the screen capture ending, while a share runs.
    pub fn screen_ended(&self) -> Option<watch::Receiver<bool>> {
        self.screen
            .as_ref()
            .and_then(|s| s.first(TrackKind::Video))
            .map(MediaTrack::ended)
    }

    /// What the local user sees of themselves.
    pub fn preview(&self) -> Option<&MediaStream> {
        self.preview.as_ref()
    }

    /// Stop every local and screen track.
    pub fn release_all(&mut self) {
        if let Some(screen) = self.screen.take() {
            screen.stop_all();
        }
        if let Some(local) = self.local.take() {
            local.stop_all();
            info!(stream = %local.id, "Local media released");
        }
        self.preview = None;
    }
}

impl std::fmt::Debug for MediaController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaController")
            .field("constraints", &self.constraints)
            .field("local", &self.local)
            .field("screen", &self.screen)
            .finish()
    }
}
