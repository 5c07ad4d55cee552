//! A scripted room session with several in-process peers.
//!
//! Every peer gets its own [`CallManager`] with loopback connections and
//! devices; all of them share one bus, so the full signaling path
//! (presence, offer/answer, ICE, screen share) runs exactly as it would
//! between real peers.

use std::sync::{Arc, Mutex};

use beacon_common::{BeaconError, NotificationQueue};
use beacon_config::BeaconConfig;
use beacon_social::loopback::{LoopbackMediaDevices, LoopbackPeerFactory, LoopbackStats};
use beacon_social::platform::MembershipStore;
use beacon_social::{
    AlertCode, AlertCodeBook, AlertMode, AlertSound, CallBackends, CallEvent, CallManager,
    CallPhase, ChannelBus, FriendList, Identity, RoomDirectory,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::settings;

/// Rounds of pumping before the simulation is considered stuck.
const MAX_SETTLE_ROUNDS: usize = 1_000;

/// What to simulate.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub room: String,
    /// Remote peers, in join order.
    pub peers: Vec<String>,
    pub deny_camera: Option<String>,
    pub screen_share: Option<String>,
    /// Start the call with a call-mode alert instead of explicit joins.
    pub alert: bool,
}

/// Final state of one peer.
#[derive(Debug, Clone)]
pub struct PeerSummary {
    pub handle: String,
    pub phase: CallPhase,
    pub sessions: usize,
    pub offers: usize,
    pub messages: usize,
    pub notifications: usize,
    pub errors: usize,
}

/// State of every peer while the call was up, plus whether everything was
/// torn down cleanly afterwards.
#[derive(Debug, Clone)]
pub struct Report {
    pub room: String,
    pub peers: Vec<PeerSummary>,
    pub clean_shutdown: bool,
}

impl Report {
    pub fn log(&self) {
        for peer in &self.peers {
            info!(
                room_id = %self.room,
                peer = %peer.handle,
                phase = %peer.phase,
                sessions = peer.sessions,
                offers = peer.offers,
                messages = peer.messages,
                notifications = peer.notifications,
                errors = peer.errors,
                "Peer summary"
            );
        }
        info!(clean_shutdown = self.clean_shutdown, "Simulation finished");
    }

    pub fn peer(&self, handle: &str) -> Option<&PeerSummary> {
        self.peers.iter().find(|p| p.handle == handle)
    }
}

struct SimPeer {
    manager: CallManager,
    events: mpsc::Receiver<CallEvent>,
    devices: Arc<LoopbackMediaDevices>,
    stats: Arc<LoopbackStats>,
    notifications: Arc<Mutex<NotificationQueue>>,
    invited: bool,
    errors: usize,
}

impl SimPeer {
    fn new(
        config: &BeaconConfig,
        bus: &ChannelBus,
        identity: Identity,
        membership: Arc<dyn MembershipStore>,
    ) -> Self {
        let factory = LoopbackPeerFactory::new();
        let stats = factory.stats();
        let devices = Arc::new(LoopbackMediaDevices::new(&identity.handle));
        let (notifier, notifications) = settings::notifier(config);
        let backends = CallBackends::new(Arc::new(factory), devices.clone())
            .with_membership(membership)
            .with_notifier(notifier)
            .with_tones(settings::tones(config, &identity.handle));
        let (manager, events) = CallManager::new(
            identity,
            settings::call_config(config),
            bus.clone(),
            backends,
        );
        Self {
            manager,
            events,
            devices,
            stats,
            notifications,
            invited: false,
            errors: 0,
        }
    }

    fn handle(&self) -> &str {
        &self.manager.identity().handle
    }

    /// Log pending events and remember invites and errors.
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match &event {
                CallEvent::CallInvite { from, .. } => {
                    info!(peer = %self.manager.identity().handle, from = %from, "Call invite");
                    self.invited = true;
                }
                CallEvent::Error(message) => {
                    warn!(peer = %self.manager.identity().handle, error = %message, "Peer reported an error");
                    self.errors += 1;
                }
                _ => debug!(peer = %self.manager.identity().handle, ?event, "Call event"),
            }
        }
    }

    async fn try_join(&mut self) {
        if let Err(e) = self.manager.join().await {
            warn!(peer = %self.handle(), error = %e, "Join failed");
            self.errors += 1;
        }
    }

    fn summary(&self, room_id: &str) -> PeerSummary {
        PeerSummary {
            handle: self.handle().to_string(),
            phase: self.manager.phase(),
            sessions: self.manager.negotiator().map_or(0, |n| n.len()),
            offers: self.stats.offers_created(),
            messages: self.manager.history().all(room_id).len(),
            notifications: self
                .notifications
                .lock()
                .map_or(0, |queue| queue.len()),
            errors: self.errors,
        }
    }
}

/// Pump every peer until none has pending input.
async fn settle(peers: &mut [SimPeer]) -> Result<(), BeaconError> {
    for _ in 0..MAX_SETTLE_ROUNDS {
        let mut handled = 0;
        for peer in peers.iter_mut() {
            handled += peer.manager.pump().await;
            peer.drain_events();
        }
        if handled == 0 {
            return Ok(());
        }
    }
    Err(BeaconError::Other("peers did not settle".into()))
}

fn find<'a>(peers: &'a mut [SimPeer], handle: &str) -> Option<&'a mut SimPeer> {
    peers.iter_mut().find(|p| p.handle() == handle)
}

/// Share peer `i`'s screen, then end the capture from the platform side.
async fn share_then_end(peers: &mut [SimPeer], i: usize) -> Result<(), BeaconError> {
    if let Err(e) = peers[i].manager.start_screen_share().await {
        warn!(peer = %peers[i].handle(), error = %e, "Screen share failed");
        peers[i].errors += 1;
        return Ok(());
    }
    settle(peers).await?;
    if let Some(screen) = peers[i].devices.last_screen() {
        screen.stop_all();
    }
    settle(peers).await
}

/// Run the scenario and report on it.
pub async fn run(config: &BeaconConfig, scenario: &Scenario) -> Result<Report, BeaconError> {
    let bus = ChannelBus::new(settings::bus_config(config));
    let local = Identity::new(&config.identity.handle, &config.identity.display_name)?;

    let mut identities = vec![local];
    for raw in &scenario.peers {
        let identity = Identity::new(raw, "")?;
        if identities.iter().any(|i| i.handle == identity.handle) {
            warn!(handle = %identity.handle, "Duplicate peer skipped");
            continue;
        }
        identities.push(identity);
    }

    // The local identity befriends everyone else; the room is a group of
    // the local identity and its friends.
    let host = identities[0].handle.clone();
    let mut friends = FriendList::new();
    for identity in &identities[1..] {
        friends.add(&host, &identity.handle)?;
    }
    let mut directory = RoomDirectory::new();
    directory.create_group(
        &scenario.room,
        &scenario.room,
        std::iter::once(host.as_str()).chain(friends.of(&host)),
    );
    let directory = Arc::new(directory);

    let mut peers: Vec<SimPeer> = identities
        .into_iter()
        .map(|identity| SimPeer::new(config, &bus, identity, directory.clone()))
        .collect();
    info!(room_id = %scenario.room, peers = peers.len(), "Starting simulation");

    if let Some(handle) = &scenario.deny_camera {
        match find(&mut peers, handle) {
            Some(peer) => peer.devices.deny_camera(true),
            None => warn!(handle = %handle, "No such peer to deny the camera to"),
        }
    }

    for peer in &mut peers {
        peer.manager.open_room(&scenario.room).await?;
    }

    let host_name = peers[0].manager.identity().display_name.clone();
    peers[0]
        .manager
        .send_text(&format!("Hello from {host_name}"))?;
    settle(&mut peers).await?;

    let mut codes = AlertCodeBook::new();
    codes.save(
        &scenario.room,
        AlertCode::new(
            "Gather",
            AlertMode::Call,
            "#ff9500",
            AlertSound::Sos,
            "Everyone to the call",
        ),
    );

    let gather = codes.find(&scenario.room, "gather").filter(|_| scenario.alert);
    if let Some(code) = gather {
        if let Err(e) = peers[0].manager.trigger_alert(code).await {
            warn!(error = %e, "Alert sender could not join");
            peers[0].errors += 1;
        }
        settle(&mut peers).await?;

        // Answer the invite the way a user would.
        for i in 1..peers.len() {
            if peers[i].invited && peers[i].manager.phase() == CallPhase::Idle {
                peers[i].try_join().await;
                settle(&mut peers).await?;
            }
        }
    } else {
        for i in 0..peers.len() {
            peers[i].try_join().await;
            settle(&mut peers).await?;
        }
    }

    if let Some(handle) = &scenario.screen_share {
        match peers.iter().position(|p| p.handle() == handle) {
            Some(i) => share_then_end(&mut peers, i).await?,
            None => warn!(handle = %handle, "No such peer to share the screen"),
        }
    }

    let summaries = peers.iter().map(|p| p.summary(&scenario.room)).collect();

    for peer in peers.iter_mut().rev() {
        peer.manager.close_room().await?;
    }
    settle(&mut peers).await?;
    let clean_shutdown = peers.iter().all(|p| {
        p.manager.room_id().is_none()
            && p.manager.media().local_stream().is_none()
            && bus.subscriber_count(&scenario.room) == 0
    });

    Ok(Report {
        room: scenario.room.clone(),
        peers: summaries,
        clean_shutdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Scenario {
        Scenario {
            room: "family".into(),
            peers: vec!["amy".into(), "zed".into()],
            deny_camera: None,
            screen_share: None,
            alert: false,
        }
    }

    fn config() -> BeaconConfig {
        let mut config = BeaconConfig::default();
        config.identity.handle = "host".into();
        config
    }

    #[tokio::test]
    async fn everyone_ends_up_connected_to_everyone() {
        let report = run(&config(), &scenario()).await.unwrap();
        assert_eq!(report.peers.len(), 3);
        for peer in &report.peers {
            assert_eq!(peer.phase, CallPhase::Active, "{}", peer.handle);
            assert_eq!(peer.sessions, 2, "{}", peer.handle);
            assert_eq!(peer.messages, 1);
            assert_eq!(peer.errors, 0);
        }
        // One offer per pair: zed > host > amy.
        assert_eq!(report.peer("zed").unwrap().offers, 2);
        assert_eq!(report.peer("host").unwrap().offers, 1);
        assert_eq!(report.peer("amy").unwrap().offers, 0);
        assert!(report.clean_shutdown);
    }

    #[tokio::test]
    async fn denied_camera_keeps_that_peer_out() {
        let mut scenario = scenario();
        scenario.deny_camera = Some("amy".into());
        let report = run(&config(), &scenario).await.unwrap();

        let amy = report.peer("amy").unwrap();
        assert_eq!(amy.phase, CallPhase::Idle);
        assert_eq!(amy.errors, 1);
        assert_eq!(report.peer("zed").unwrap().sessions, 1);
        assert!(report.clean_shutdown);
    }

    #[tokio::test]
    async fn alert_invites_bring_everyone_in() {
        let mut scenario = scenario();
        scenario.alert = true;
        scenario.screen_share = Some("zed".into());
        let report = run(&config(), &scenario).await.unwrap();

        for peer in &report.peers {
            assert_eq!(peer.phase, CallPhase::Active, "{}", peer.handle);
            assert_eq!(peer.sessions, 2);
            assert_eq!(peer.messages, 2);
        }
        // Hello and alert notifications on the receiving side.
        assert!(report.peer("amy").unwrap().notifications >= 3);
    }

    #[tokio::test]
    async fn duplicate_and_invalid_handles() {
        let mut scenario = scenario();
        scenario.peers = vec!["amy".into(), "AMY".into()];
        let report = run(&config(), &scenario).await.unwrap();
        assert_eq!(report.peers.len(), 2);

        scenario.peers = vec!["!!!".into()];
        assert!(matches!(
            run(&config(), &scenario).await,
            Err(BeaconError::Identity(_))
        ));
    }
}
