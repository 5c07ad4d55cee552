//! Track and stream handles.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Where a local track comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackSource {
    Microphone,
    Camera,
    Screen,
}

/// Which devices to capture for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

struct TrackState {
    enabled: AtomicBool,
    ended: watch::Sender<bool>,
}

/// A handle to a live capture track.
///
/// Clones share state: muting or stopping one clone affects every holder,
/// including the senders a track is attached to.
#[derive(Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    source: TrackSource,
    label: String,
    state: Arc<TrackState>,
}

impl MediaTrack {
    pub fn new(id: impl Into<String>, source: TrackSource, label: impl Into<String>) -> Self {
        let kind = match source {
            TrackSource::Microphone => TrackKind::Audio,
            TrackSource::Camera | TrackSource::Screen => TrackKind::Video,
        };
        let (ended, _) = watch::channel(false);
        Self {
            id: id.into(),
            kind,
            source,
            label: label.into(),
            state: Arc::new(TrackState {
                enabled: AtomicBool::new(true),
                ended,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_ended(&self) -> bool {
        *self.state.ended.borrow()
    }

    /// End the track. Called locally on release, or by the platform when
    /// the capture goes away (e.g. the user clicks "Stop sharing").
    pub fn stop(&self) {
        self.state.ended.send_replace(true);
    }

    /// Watch for the track ending.
    pub fn ended(&self) -> watch::Receiver<bool> {
        self.state.ended.subscribe()
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("enabled", &self.is_enabled())
            .field("ended", &self.is_ended())
            .finish()
    }
}

impl PartialEq for MediaTrack {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

/// An ordered group of tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn first(&self, kind: TrackKind) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(move |t| t.kind() == kind)
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// A track received from a remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
}
