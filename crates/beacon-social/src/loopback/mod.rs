//! In-process platform backends for simulations and tests.
//!
//! Loopback connections do not carry media. They produce well-formed
//! descriptions and candidates and report the same events a real stack
//! would, so the call layer can be driven end to end on one bus.

mod devices;
mod peer;

pub use devices::LoopbackMediaDevices;
pub use peer::{LoopbackPeer, LoopbackPeerFactory, LoopbackStats};
