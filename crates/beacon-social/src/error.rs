//! Error and outcome types for the call layer.
//!
//! Two channels are kept apart:
//! - [`CallError`] must reach the caller (media denied, illegal transition,
//!   a connection that refuses a description).
//! - [`IgnoreReason`] is the typed record of an input that was dropped on
//!   purpose (stale or misaddressed signals, glare, bad candidates). These
//!   are logged at debug level and reported through [`Dispatch`], never as
//!   errors.

use std::fmt;

use beacon_common::BeaconError;

use crate::call::CallPhase;
use crate::media::TrackKind;

/// Which capture the platform was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    CameraAndMicrophone,
    Display,
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CameraAndMicrophone => write!(f, "camera and microphone"),
            Self::Display => write!(f, "screen"),
        }
    }
}

/// Camera, microphone or display capture could not be obtained.
///
/// Always fatal to the join or share that asked for it and never retried
/// automatically; the user can grant access and try again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaAcquisitionError {
    #[error("access to the {0} was denied; allow it in your system settings and try again")]
    PermissionDenied(CaptureSource),

    #[error("no {0} device was found; connect one and try again")]
    NoDevice(CaptureSource),

    #[error("{0} capture failed: {1}")]
    Failed(CaptureSource, String),
}

impl MediaAcquisitionError {
    pub fn source_kind(&self) -> CaptureSource {
        match self {
            Self::PermissionDenied(s) | Self::NoDevice(s) | Self::Failed(s, _) => *s,
        }
    }

    /// Media failures are resolved by the user (grant permission, plug in a
    /// device) and then retried by hand.
    pub fn is_retryable(&self) -> bool {
        true
    }
}

/// A peer connection rejected an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ConnectionError(pub String);

impl ConnectionError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// A raw handle normalised to nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("handle {0:?} has no usable characters (allowed: a-z, 0-9, _)")]
pub struct IdentityError(pub String);

/// Errors surfaced to the caller of a call-layer operation.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Media(#[from] MediaAcquisitionError),

    #[error("cannot {action} while the call is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: CallPhase,
    },

    #[error("no room is open")]
    NoActiveRoom,

    #[error("message is empty")]
    EmptyMessage,

    #[error("there is no local {0} track")]
    MissingTrack(TrackKind),

    #[error("peer connection with {peer} failed: {source}")]
    Connection {
        peer: String,
        #[source]
        source: ConnectionError,
    },
}

impl CallError {
    pub(crate) fn connection(peer: &str, source: ConnectionError) -> Self {
        Self::Connection {
            peer: peer.to_string(),
            source,
        }
    }
}

impl From<CallError> for BeaconError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Media(e) => BeaconError::Media(e.to_string()),
            other => BeaconError::Call(other.to_string()),
        }
    }
}

impl From<IdentityError> for BeaconError {
    fn from(err: IdentityError) -> Self {
        BeaconError::Identity(err.to_string())
    }
}

/// Why an input was dropped without surfacing an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Addressed to another room, another handle, or a torn-down session.
    StaleSignal,
    /// An offer or answer arrived while the session could not accept it.
    NegotiationConflict,
    /// An ICE candidate could not be applied (no session, no remote
    /// description yet, duplicate).
    CandidateApplicationFailure,
    /// Our own envelope came back.
    SelfMessage,
    /// The sender is not a member of the room.
    NotAMember,
    /// A presence update that changed nothing.
    DuplicatePresence,
    /// No room is open to receive it.
    NoActiveRoom,
}

/// Result of feeding one input to the call layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Ignored(IgnoreReason),
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }
}
