//! Broadcast-backed channel bus and its subscriptions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use crate::protocol::Envelope;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Prefix keeping room channels apart from unrelated traffic.
    pub namespace: String,
    /// Envelopes buffered per room. A subscriber further behind than this
    /// skips the oldest envelopes.
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            namespace: "beacon-room".into(),
            capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// Per-subscriber queues of one room, keyed by subscriber id. Each queue is
/// fed only by the other subscribers, so a busy publisher never crowds out
/// its own inbound traffic.
type RoomQueues = HashMap<u64, broadcast::Sender<Envelope>>;

struct BusInner {
    config: BusConfig,
    next_subscriber: AtomicU64,
    channels: Mutex<HashMap<String, RoomQueues>>,
}

/// Cheap-to-clone handle on the process-wide bus.
#[derive(Clone)]
pub struct ChannelBus {
    inner: Arc<BusInner>,
}

impl ChannelBus {
    pub fn new(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                config,
                next_subscriber: AtomicU64::new(1),
                channels: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Namespaced channel name for a room.
    pub fn channel_name(&self, room_id: &str) -> String {
        format!("{}:{room_id}", self.inner.config.namespace)
    }

    /// Start listening to a room.
    pub fn subscribe(&self, room_id: &str) -> Subscription {
        let channel = self.channel_name(room_id);
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = broadcast::channel(self.inner.config.capacity.max(1));
        self.lock_channels()
            .entry(channel.clone())
            .or_default()
            .insert(id, tx);
        debug!(channel = %channel, subscriber = id, "Subscribed to room channel");
        Subscription {
            id,
            room_id: room_id.to_string(),
            channel,
            bus: self.clone(),
            rx,
        }
    }

    /// Publish to every subscriber of a room. Returns how many subscribers
    /// will see the envelope.
    pub fn publish(&self, room_id: &str, envelope: Envelope) -> usize {
        self.send(&self.channel_name(room_id), None, envelope)
    }

    /// Number of live subscriptions on a room.
    pub fn subscriber_count(&self, room_id: &str) -> usize {
        self.lock_channels()
            .get(&self.channel_name(room_id))
            .map_or(0, HashMap::len)
    }

    /// Rooms with at least one live subscription.
    pub fn active_rooms(&self) -> usize {
        self.lock_channels().len()
    }

    /// Fan an envelope out to every queue of the channel except the
    /// publisher's own. The lock is held for the whole fan-out, so all
    /// subscribers observe one publish order.
    fn send(&self, channel: &str, origin: Option<u64>, envelope: Envelope) -> usize {
        let kind = envelope.kind();
        let channels = self.lock_channels();
        let mut reached = 0;
        if let Some(queues) = channels.get(channel) {
            for (id, tx) in queues {
                if Some(*id) != origin && tx.send(envelope.clone()).is_ok() {
                    reached += 1;
                }
            }
        }
        debug!(channel = %channel, ?kind, receivers = reached, "Published envelope");
        reached
    }

    fn unsubscribe(&self, channel: &str, id: u64) {
        let mut channels = self.lock_channels();
        if let Some(queues) = channels.get_mut(channel) {
            queues.remove(&id);
            if queues.is_empty() {
                channels.remove(channel);
            }
        }
        debug!(channel = %channel, subscriber = id, "Unsubscribed from room channel");
    }

    fn lock_channels(&self) -> std::sync::MutexGuard<'_, HashMap<String, RoomQueues>> {
        self.inner
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ChannelBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// A live listener on one room. Dropping it unsubscribes; envelopes already
/// delivered to other subscribers are unaffected.
pub struct Subscription {
    id: u64,
    room_id: String,
    channel: String,
    bus: ChannelBus,
    rx: broadcast::Receiver<Envelope>,
}

impl Subscription {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Publish to every other subscriber of this room.
    pub fn publish(&self, envelope: Envelope) -> usize {
        self.bus.send(&self.channel, Some(self.id), envelope)
    }

    /// Wait for the next envelope from another subscriber.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = %self.channel, skipped, "Subscriber lagged; envelopes dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next envelope if one is already waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => return Some(envelope),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(channel = %self.channel, skipped, "Subscriber lagged; envelopes dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.channel, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PresencePayload;

    fn presence(handle: &str, in_call: bool) -> Envelope {
        Envelope::presence(
            handle,
            PresencePayload {
                room_id: "r1".into(),
                handle: handle.into(),
                in_call,
            },
        )
    }

    #[tokio::test]
    async fn delivers_to_other_subscribers_only() {
        let bus = ChannelBus::default();
        let mut amy = bus.subscribe("r1");
        let mut zed = bus.subscribe("r1");

        assert_eq!(amy.publish(presence("amy", true)), 1);

        let got = zed.recv().await.unwrap();
        assert_eq!(got.sender_handle(), "amy");
        assert!(amy.try_recv().is_none());
    }

    #[tokio::test]
    async fn preserves_publish_order_per_room() {
        let bus = ChannelBus::default();
        let amy = bus.subscribe("r1");
        let mut zed = bus.subscribe("r1");

        amy.publish(presence("amy", true));
        amy.publish(presence("amy", false));
        amy.publish(presence("amy", true));

        let flags: Vec<bool> = std::iter::from_fn(|| zed.try_recv())
            .map(|env| match env {
                Envelope::CallPresence { payload, .. } => payload.in_call,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn rooms_are_isolated() {
        let bus = ChannelBus::default();
        let r1 = bus.subscribe("r1");
        let mut r2 = bus.subscribe("r2");
        r1.publish(presence("amy", true));
        assert!(r2.try_recv().is_none());
        assert_eq!(bus.subscriber_count("r1"), 1);
    }

    #[test]
    fn late_subscribers_see_nothing_earlier() {
        let bus = ChannelBus::default();
        let amy = bus.subscribe("r1");
        amy.publish(presence("amy", true));
        let mut zed = bus.subscribe("r1");
        assert!(zed.try_recv().is_none());
    }

    #[test]
    fn bus_level_publish_reaches_everyone() {
        let bus = ChannelBus::default();
        let mut a = bus.subscribe("r1");
        let mut b = bus.subscribe("r1");
        assert_eq!(bus.publish("r1", presence("amy", true)), 2);
        assert!(a.try_recv().is_some());
        assert!(b.try_recv().is_some());
    }

    #[test]
    fn dropping_a_subscription_unsubscribes() {
        let bus = ChannelBus::default();
        let a = bus.subscribe("r1");
        let b = bus.subscribe("r1");
        drop(b);
        assert_eq!(bus.subscriber_count("r1"), 1);
        assert_eq!(a.publish(presence("amy", true)), 0);
    }

    #[test]
    fn last_unsubscribe_forgets_the_room() {
        let bus = ChannelBus::default();
        let a = bus.subscribe("r1");
        let b = bus.subscribe("r2");
        assert_eq!(bus.active_rooms(), 2);
        drop(a);
        assert_eq!(bus.active_rooms(), 1);
        assert_eq!(bus.subscriber_count("r1"), 0);
        drop(b);
        assert_eq!(bus.active_rooms(), 0);

        // A fresh subscription recreates the room.
        let _c = bus.subscribe("r1");
        assert_eq!(bus.subscriber_count("r1"), 1);
    }

    #[test]
    fn own_publishes_never_crowd_out_inbound_envelopes() {
        let bus = ChannelBus::new(BusConfig {
            namespace: "test".into(),
            capacity: 4,
        });
        let mut amy = bus.subscribe("r1");
        let zed = bus.subscribe("r1");

        zed.publish(presence("zed", true));
        for i in 0..300 {
            amy.publish(presence("amy", i % 2 == 0));
        }

        let got = amy.try_recv().unwrap();
        assert_eq!(got.sender_handle(), "zed");
        assert!(amy.try_recv().is_none());
    }

    #[test]
    fn lagging_subscriber_skips_oldest() {
        let bus = ChannelBus::new(BusConfig {
            namespace: "test".into(),
            capacity: 2,
        });
        let amy = bus.subscribe("r1");
        let mut zed = bus.subscribe("r1");
        for in_call in [true, false, true, false] {
            amy.publish(presence("amy", in_call));
        }
        let seen = std::iter::from_fn(|| zed.try_recv()).count();
        assert_eq!(seen, 2);
        assert_eq!(bus.channel_name("r1"), "test:r1");
    }
}
