use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{CaptureSource, MediaAcquisitionError};
use crate::media::{MediaConstraints, MediaStream, MediaTrack, TrackSource};
use crate::platform::MediaDevices;

/// Fake capture devices. Each request yields fresh tracks; camera and
/// display access can be denied to exercise failure paths.
#[derive(Debug)]
pub struct LoopbackMediaDevices {
    owner: String,
    deny_camera: AtomicBool,
    deny_display: AtomicBool,
    user_requests: AtomicUsize,
    display_requests: AtomicUsize,
    last_screen: Mutex<Option<MediaStream>>,
}

impl LoopbackMediaDevices {
    /// `owner` prefixes every track id so tracks from different peers are
    /// told apart in logs.
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            deny_camera: AtomicBool::new(false),
            deny_display: AtomicBool::new(false),
            user_requests: AtomicUsize::new(0),
            display_requests: AtomicUsize::new(0),
            last_screen: Mutex::new(None),
        }
    }

    pub fn deny_camera(&self, deny: bool) {
        self.deny_camera.store(deny, Ordering::Relaxed);
    }

    pub fn deny_display(&self, deny: bool) {
        self.deny_display.store(deny, Ordering::Relaxed);
    }

    pub fn user_media_requests(&self) -> usize {
        self.user_requests.load(Ordering::Relaxed)
    }

    pub fn display_media_requests(&self) -> usize {
        self.display_requests.load(Ordering::Relaxed)
    }

    /// The most recent display capture handed out. Stopping its tracks
    /// simulates the user ending the share from the system UI.
    pub fn last_screen(&self) -> Option<MediaStream> {
        self.last_screen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MediaDevices for LoopbackMediaDevices {
    async fn user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, MediaAcquisitionError> {
        let n = self.user_requests.fetch_add(1, Ordering::Relaxed) + 1;
        if self.deny_camera.load(Ordering::Relaxed) {
            return Err(MediaAcquisitionError::PermissionDenied(
                CaptureSource::CameraAndMicrophone,
            ));
        }
        if !constraints.audio && !constraints.video {
            return Err(MediaAcquisitionError::Failed(
                CaptureSource::CameraAndMicrophone,
                "no tracks requested".into(),
            ));
        }

        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(MediaTrack::new(
                format!("{}-mic-{n}", self.owner),
                TrackSource::Microphone,
                "Loopback microphone",
            ));
        }
        if constraints.video {
            tracks.push(MediaTrack::new(
                format!("{}-cam-{n}", self.owner),
                TrackSource::Camera,
                "Loopback camera",
            ));
        }
        Ok(MediaStream::new(format!("{}-local-{n}", self.owner), tracks))
    }

    async fn display_media(&self) -> Result<MediaStream, MediaAcquisitionError> {
        let n = self.display_requests.fetch_add(1, Ordering::Relaxed) + 1;
        if self.deny_display.load(Ordering::Relaxed) {
            return Err(MediaAcquisitionError::PermissionDenied(
                CaptureSource::Display,
            ));
        }
        let stream = MediaStream::new(
            format!("{}-display-{n}", self.owner),
            vec![MediaTrack::new(
                format!("{}-screen-{n}", self.owner),
                TrackSource::Screen,
                "Loopback screen",
            )],
        );
        *self
            .last_screen
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(stream.clone());
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::TrackKind;

    #[tokio::test]
    async fn yields_fresh_tracks_per_request() {
        let devices = LoopbackMediaDevices::new("amy");
        let a = devices.user_media(MediaConstraints::default()).await.unwrap();
        let b = devices.user_media(MediaConstraints::default()).await.unwrap();
        assert_eq!(a.tracks.len(), 2);
        assert_ne!(a.first(TrackKind::Video), b.first(TrackKind::Video));
        assert_eq!(devices.user_media_requests(), 2);
    }

    #[tokio::test]
    async fn honours_constraints_and_denial() {
        let devices = LoopbackMediaDevices::new("amy");
        let audio_only = devices
            .user_media(MediaConstraints {
                audio: true,
                video: false,
            })
            .await
            .unwrap();
        assert!(audio_only.first(TrackKind::Video).is_none());

        devices.deny_camera(true);
        let err = devices
            .user_media(MediaConstraints::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaAcquisitionError::PermissionDenied(_)));

        devices.deny_display(true);
        assert!(devices.display_media().await.is_err());
        assert!(devices.last_screen().is_none());
    }
}
