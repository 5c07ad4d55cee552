use std::sync::Arc;

use tokio::sync::mpsc;

use super::*;
use crate::error::{CallError, IgnoreReason};
use crate::loopback::{LoopbackPeerFactory, LoopbackStats};
use crate::media::{MediaTrack, TrackKind, TrackSource};
use crate::platform::{PeerEvent, PeerEventKind, RtcConfiguration};
use crate::protocol::{IceCandidate, Signal, SignalPayload};

struct Side {
    negotiator: Negotiator,
    stats: Arc<LoopbackStats>,
    events: mpsc::UnboundedReceiver<PeerEvent>,
    tracks: Vec<MediaTrack>,
}

fn side(handle: &str) -> Side {
    let factory = LoopbackPeerFactory::new();
    let stats = factory.stats();
    let (tx, events) = mpsc::unbounded_channel();
    Side {
        negotiator: Negotiator::new(
            handle,
            "r1",
            RtcConfiguration::with_stun_servers(["stun:stun.example.org:3478"]),
            Arc::new(factory),
            tx,
        ),
        stats,
        events,
        tracks: vec![
            MediaTrack::new(format!("{handle}-mic"), TrackSource::Microphone, "mic"),
            MediaTrack::new(format!("{handle}-cam"), TrackSource::Camera, "cam"),
        ],
    }
}

fn local_candidates(side: &mut Side) -> Vec<(String, IceCandidate)> {
    let mut out = Vec::new();
    while let Ok(event) = side.events.try_recv() {
        if let PeerEventKind::LocalCandidate(c) = event.kind {
            out.push((event.peer, c));
        }
    }
    out
}

#[test]
fn election_prefers_larger_handle() {
    assert!(should_offer("zed", "amy"));
    assert!(!should_offer("amy", "zed"));
    assert!(!should_offer("amy", "amy"));
}

#[test]
fn ensure_is_idempotent() {
    let mut zed = side("zed");
    let first = zed.negotiator.ensure("amy", &zed.tracks).unwrap().id().clone();
    let second = zed.negotiator.ensure("amy", &[]).unwrap().id().clone();
    assert_eq!(first, second);
    assert_eq!(zed.stats.connections_to("amy"), 1);

    let session = zed.negotiator.session("amy").unwrap();
    assert_eq!(session.state(), SessionState::Connecting);
    assert_eq!(session.sender_track(TrackKind::Video), Some("zed-cam"));
    assert_eq!(session.sender_track(TrackKind::Audio), Some("zed-mic"));
}

#[tokio::test]
async fn offer_answer_ice_round_trip() {
    let mut zed = side("zed");
    let mut amy = side("amy");

    zed.negotiator.ensure("amy", &zed.tracks).unwrap();
    let offer = zed.negotiator.make_offer("amy").await.unwrap().unwrap();
    assert_eq!(offer.to, "amy");
    assert!(matches!(offer.signal, Signal::Offer { .. }));
    assert_eq!(
        zed.negotiator.session("amy").unwrap().signaling(),
        SignalingState::HaveLocalOffer
    );

    // A second offer while one is in flight is a no-op.
    assert!(zed.negotiator.make_offer("amy").await.unwrap().is_none());

    let answer = match amy
        .negotiator
        .handle_signal(&offer, &amy.tracks)
        .await
        .unwrap()
    {
        SignalOutcome::Reply(answer) => answer,
        other => panic!("expected an answer, got {other:?}"),
    };
    assert!(matches!(answer.signal, Signal::Answer { .. }));
    assert_eq!(
        amy.negotiator.session("zed").unwrap().state(),
        SessionState::Stable
    );

    assert_eq!(
        zed.negotiator.handle_signal(&answer, &[]).await.unwrap(),
        SignalOutcome::Applied
    );
    assert_eq!(
        zed.negotiator.session("amy").unwrap().state(),
        SessionState::Stable
    );

    for (peer, candidate) in local_candidates(&mut zed) {
        let ice = zed.negotiator.candidate_signal(&peer, candidate);
        assert_eq!(
            amy.negotiator.handle_signal(&ice, &[]).await.unwrap(),
            SignalOutcome::Applied
        );
    }
    assert_eq!(amy.stats.candidates_applied(), 1);
    assert_eq!(zed.stats.offers_created(), 1);
    assert_eq!(amy.stats.offers_created(), 0);
}

#[tokio::test]
async fn misaddressed_signals_do_not_touch_sessions() {
    let mut amy = side("amy");
    let offer = |room: &str, to: &str| SignalPayload {
        room_id: room.into(),
        to: to.into(),
        from: "zed".into(),
        signal: Signal::Offer { sdp: "v=0".into() },
    };

    for payload in [offer("r1", "bob"), offer("r2", "amy")] {
        assert_eq!(
            amy.negotiator.handle_signal(&payload, &amy.tracks).await.unwrap(),
            SignalOutcome::Ignored(IgnoreReason::StaleSignal)
        );
    }
    assert!(amy.negotiator.is_empty());
    assert_eq!(amy.stats.total_connections(), 0);
}

#[tokio::test]
async fn ice_for_unknown_peer_is_a_candidate_failure() {
    let mut amy = side("amy");
    let ice = SignalPayload {
        room_id: "r1".into(),
        to: "amy".into(),
        from: "ghost".into(),
        signal: Signal::Ice {
            candidate: IceCandidate {
                candidate: "candidate:9".into(),
                sdp_mid: None,
                sdp_m_line_index: None,
            },
        },
    };
    assert_eq!(
        amy.negotiator.handle_signal(&ice, &[]).await.unwrap(),
        SignalOutcome::Ignored(IgnoreReason::CandidateApplicationFailure)
    );
    assert!(amy.negotiator.session("ghost").is_none());
}

#[tokio::test]
async fn ice_before_remote_description_is_swallowed() {
    let mut zed = side("zed");
    zed.negotiator.ensure("amy", &zed.tracks).unwrap();
    let ice = SignalPayload {
        room_id: "r1".into(),
        to: "zed".into(),
        from: "amy".into(),
        signal: Signal::Ice {
            candidate: IceCandidate {
                candidate: "candidate:1".into(),
                sdp_mid: Some("0".into()),
                sdp_m_line_index: Some(0),
            },
        },
    };
    assert_eq!(
        zed.negotiator.handle_signal(&ice, &[]).await.unwrap(),
        SignalOutcome::Ignored(IgnoreReason::CandidateApplicationFailure)
    );
}

#[tokio::test]
async fn crossing_offer_is_a_conflict() {
    let mut amy = side("amy");
    let mut zed = side("zed");

    amy.negotiator.ensure("zed", &amy.tracks).unwrap();
    amy.negotiator.make_offer("zed").await.unwrap();

    zed.negotiator.ensure("amy", &zed.tracks).unwrap();
    let zed_offer = zed.negotiator.make_offer("amy").await.unwrap().unwrap();

    assert_eq!(
        amy.negotiator.handle_signal(&zed_offer, &amy.tracks).await.unwrap(),
        SignalOutcome::Ignored(IgnoreReason::NegotiationConflict)
    );
}

#[tokio::test]
async fn failed_answer_leaves_the_session_open_to_new_offers() {
    let mut zed = side("zed");
    let mut amy = side("amy");

    zed.negotiator.ensure("amy", &zed.tracks).unwrap();
    let offer = zed.negotiator.make_offer("amy").await.unwrap().unwrap();

    amy.stats.fail_next_answers(1);
    let err = amy.negotiator.handle_signal(&offer, &amy.tracks).await;
    assert!(matches!(err, Err(CallError::Connection { .. })));
    assert_eq!(
        amy.negotiator.session("zed").unwrap().signaling(),
        SignalingState::Stable
    );

    // The same offer goes through once the platform recovers.
    let outcome = amy.negotiator.handle_signal(&offer, &amy.tracks).await.unwrap();
    assert!(matches!(outcome, SignalOutcome::Reply(_)));
    assert_eq!(amy.stats.answers_created(), 1);
    assert_eq!(
        amy.negotiator.session("zed").unwrap().state(),
        SessionState::Stable
    );
}

#[tokio::test]
async fn unexpected_answer_is_ignored() {
    let mut zed = side("zed");
    zed.negotiator.ensure("amy", &zed.tracks).unwrap();
    let answer = SignalPayload {
        room_id: "r1".into(),
        to: "zed".into(),
        from: "amy".into(),
        signal: Signal::Answer { sdp: "v=0".into() },
    };
    assert_eq!(
        zed.negotiator.handle_signal(&answer, &[]).await.unwrap(),
        SignalOutcome::Ignored(IgnoreReason::NegotiationConflict)
    );
}

#[tokio::test]
async fn replace_outbound_skips_sessions_without_a_sender() {
    let mut zed = side("zed");
    let audio_only = vec![zed.tracks[0].clone()];
    zed.negotiator.ensure("amy", &zed.tracks).unwrap();
    zed.negotiator.ensure("bob", &audio_only).unwrap();

    let screen = MediaTrack::new("zed-screen", TrackSource::Screen, "screen");
    let replaced = zed.negotiator.replace_outbound(TrackKind::Video, &screen).await;
    assert_eq!(replaced, 1);
    assert_eq!(
        zed.negotiator.session("amy").unwrap().sender_track(TrackKind::Video),
        Some("zed-screen")
    );
    assert_eq!(
        zed.negotiator.session("amy").unwrap().sender_track(TrackKind::Audio),
        Some("zed-mic")
    );
    assert!(zed
        .negotiator
        .session("bob")
        .unwrap()
        .sender_track(TrackKind::Video)
        .is_none());
}

#[tokio::test]
async fn close_is_idempotent_and_invalidates_events() {
    let mut zed = side("zed");
    let id = zed.negotiator.ensure("amy", &zed.tracks).unwrap().id().clone();
    assert!(zed.negotiator.is_current("amy", &id));

    assert!(zed.negotiator.close("amy"));
    assert!(!zed.negotiator.close("amy"));
    assert!(!zed.negotiator.is_current("amy", &id));
    assert_eq!(zed.stats.closed(), 1);

    // A new session gets a new id; events from the old one stay stale.
    let new_id = zed.negotiator.ensure("amy", &zed.tracks).unwrap().id().clone();
    assert_ne!(id, new_id);
    assert!(!zed.negotiator.is_current("amy", &id));
    assert_eq!(zed.stats.connections_to("amy"), 2);

    zed.negotiator.ensure("bob", &zed.tracks).unwrap();
    assert_eq!(zed.negotiator.close_all(), vec!["amy".to_string(), "bob".to_string()]);
    assert!(zed.negotiator.is_empty());
}
