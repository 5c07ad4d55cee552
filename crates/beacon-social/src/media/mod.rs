//! Local media: capture tracks, streams, and the controller that decides
//! which tracks every session sends.
//!
//! Audio senders are never touched after a session is created. Video
//! senders carry the camera, or the screen while a share is running; the
//! swap goes through the platform's track replacement, so no renegotiation
//! is needed.

mod controller;
mod types;

pub use controller::MediaController;
pub use types::{MediaConstraints, MediaStream, MediaTrack, RemoteTrack, TrackKind, TrackSource};
