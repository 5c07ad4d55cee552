//! Types, configuration, commands and events for the call manager.

use std::fmt;
use std::sync::Arc;

use crate::alert::AlertCode;
use crate::chat::{ChatHistoryConfig, Message};
use crate::media::{MediaConstraints, RemoteTrack, TrackKind};
use crate::platform::{
    MediaDevices, MembershipStore, Notifier, PeerConnectionFactory, Silent, TonePlayer,
};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where the local peer is in the call lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallPhase {
    #[default]
    Idle,
    Joining,
    Active,
    Leaving,
}

impl CallPhase {
    /// Joining or active: we have announced ourselves as in call.
    pub fn in_call(&self) -> bool {
        matches!(self, Self::Joining | Self::Active)
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Joining => write!(f, "joining"),
            Self::Active => write!(f, "active"),
            Self::Leaving => write!(f, "leaving"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the call manager.
#[derive(Debug, Clone)]
pub struct CallConfig {
    /// STUN server URLs handed to every peer connection.
    pub stun_servers: Vec<String>,
    /// Devices captured on join.
    pub constraints: MediaConstraints,
    /// Capacity of the UI event channel.
    pub event_capacity: usize,
    pub history: ChatHistoryConfig,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            stun_servers: vec!["stun:stun.l.google.com:19302".into()],
            constraints: MediaConstraints::default(),
            event_capacity: 256,
            history: ChatHistoryConfig::default(),
        }
    }
}

/// Platform collaborators the manager drives.
#[derive(Clone)]
pub struct CallBackends {
    pub factory: Arc<dyn PeerConnectionFactory>,
    pub devices: Arc<dyn MediaDevices>,
    pub membership: Arc<dyn MembershipStore>,
    pub notifier: Arc<dyn Notifier>,
    pub tones: Arc<dyn TonePlayer>,
}

impl CallBackends {
    /// Connection and capture backends; no membership data, notifications
    /// or tones.
    pub fn new(factory: Arc<dyn PeerConnectionFactory>, devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            factory,
            devices,
            membership: Arc::new(Silent),
            notifier: Arc::new(Silent),
            tones: Arc::new(Silent),
        }
    }

    pub fn with_membership(mut self, membership: Arc<dyn MembershipStore>) -> Self {
        self.membership = membership;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_tones(mut self, tones: Arc<dyn TonePlayer>) -> Self {
        self.tones = tones;
        self
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Local actions accepted by [`super::CallManager::run`].
#[derive(Debug, Clone)]
pub enum CallCommand {
    OpenRoom(String),
    CloseRoom,
    Join,
    Leave,
    SendText(String),
    TriggerAlert(AlertCode),
    ToggleTrack(TrackKind),
    StartScreenShare,
    StopScreenShare,
    Shutdown,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events emitted by the call manager for the UI.
#[derive(Debug, Clone)]
pub enum CallEvent {
    RoomOpened {
        room_id: String,
    },
    RoomClosed {
        room_id: String,
    },
    PhaseChanged {
        room_id: String,
        phase: CallPhase,
    },
    MessageReceived {
        room_id: String,
        message: Message,
    },
    /// A call-mode alert arrived while we were not in the call.
    CallInvite {
        room_id: String,
        from: String,
    },
    PeerJoined {
        room_id: String,
        peer: String,
    },
    PeerLeft {
        room_id: String,
        peer: String,
    },
    RemoteTrack {
        peer: String,
        track: RemoteTrack,
    },
    /// The peer's tiles should be removed.
    RemoteMediaClosed {
        peer: String,
    },
    ScreenShareStarted,
    ScreenShareStopped,
    TrackToggled {
        kind: TrackKind,
        enabled: bool,
    },
    Error(String),
}
