//! Serverless room signaling and call coordination.
//!
//! Peers sharing a [`ChannelBus`] exchange chat messages, alerts and call
//! signals per room, track each other's in-call presence, and negotiate
//! direct media sessions without a central server. The platform side
//! (peer connections, capture devices, notifications) sits behind the
//! traits in [`platform`]; [`loopback`] implements them in-process.

pub mod alert;
pub mod bus;
pub mod call;
pub mod chat;
pub mod error;
pub mod identity;
pub mod loopback;
pub mod media;
pub mod negotiator;
pub mod platform;
pub mod presence;
pub mod protocol;
pub mod rooms;

pub use alert::{AlertCode, AlertCodeBook, AlertMode, AlertSound};
pub use bus::{BusConfig, ChannelBus, Subscription};
pub use call::{CallBackends, CallCommand, CallConfig, CallEvent, CallManager, CallPhase};
pub use chat::{ChatHistory, ChatHistoryConfig, Message, MessageBody};
pub use error::{
    CallError, CaptureSource, ConnectionError, Dispatch, IdentityError, IgnoreReason,
    MediaAcquisitionError,
};
pub use identity::{clean_handle, Identity, PublicIdentity};
pub use media::{MediaConstraints, MediaController, MediaStream, MediaTrack, TrackKind};
pub use negotiator::{Negotiator, SessionState, SignalOutcome, SignalingState};
pub use presence::{PresenceRegistry, PresenceTransition};
pub use protocol::{Envelope, EnvelopeKind, IceCandidate, PresencePayload, Signal, SignalPayload};
pub use rooms::{FriendList, Room, RoomDirectory, RoomKind};
