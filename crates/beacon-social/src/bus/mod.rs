//! In-process, room-scoped publish/subscribe.
//!
//! Every subscriber gets its own bounded queue, filled only by the other
//! subscribers of the same room. Envelopes reach every other
//! subscriber of the same room in publish order; a subscriber never sees
//! its own envelopes, and nobody sees envelopes published before they
//! subscribed. There is no persistence and no replay.

mod channel;

pub use channel::{BusConfig, ChannelBus, Subscription};
