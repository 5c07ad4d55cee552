//! Mapping from the file configuration to the runtime types.

use std::sync::{Arc, Mutex};

use beacon_common::NotificationQueue;
use beacon_config::BeaconConfig;
use beacon_social::platform::{Notifier, Silent, TonePlayer};
use beacon_social::{AlertSound, BusConfig, CallConfig, ChatHistoryConfig, MediaConstraints};
use tracing::info;

pub fn bus_config(config: &BeaconConfig) -> BusConfig {
    BusConfig {
        namespace: config.bus.namespace.clone(),
        capacity: config.bus.capacity as usize,
    }
}

pub fn call_config(config: &BeaconConfig) -> CallConfig {
    CallConfig {
        stun_servers: config.call.stun_servers.clone(),
        constraints: MediaConstraints {
            audio: config.call.media.audio,
            video: config.call.media.video,
        },
        event_capacity: config.call.event_capacity as usize,
        history: ChatHistoryConfig {
            max_messages_per_room: config.chat.max_messages_per_room as usize,
        },
    }
}

/// Tone player that logs the pattern it would play.
#[derive(Debug)]
pub struct LoggedTones {
    pub handle: String,
    pub volume: f64,
}

impl TonePlayer for LoggedTones {
    fn play(&self, sound: AlertSound) {
        let pattern: Vec<u32> = sound.schedule().iter().map(|s| s.frequency_hz).collect();
        info!(
            peer = %self.handle,
            ?sound,
            volume = self.volume,
            ?pattern,
            duration_ms = sound.total_duration().as_millis() as u64,
            "Playing alert tone"
        );
    }
}

/// Tone player for one peer, honouring the alerts section.
pub fn tones(config: &BeaconConfig, handle: &str) -> Arc<dyn TonePlayer> {
    if config.alerts.enabled {
        Arc::new(LoggedTones {
            handle: handle.to_string(),
            volume: config.alerts.volume,
        })
    } else {
        Arc::new(Silent)
    }
}

/// Notification sink for one peer. The queue is returned so the caller can
/// report on it; it stays empty when desktop notifications are off.
pub fn notifier(config: &BeaconConfig) -> (Arc<dyn Notifier>, Arc<Mutex<NotificationQueue>>) {
    let queue = Arc::new(Mutex::new(NotificationQueue::new(64)));
    if config.alerts.desktop_notifications {
        (queue.clone(), queue)
    } else {
        (Arc::new(Silent), queue)
    }
}
