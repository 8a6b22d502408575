use meshcall_client::LinkState;
use meshcall_core::{PeerId, ServerMessage};
use meshcall_client::backend::{PeerConnection as _, PeerConnectionEvent, SignalingState};

use crate::utils::{LoopbackRelay, TestPeer, init_tracing};

#[tokio::test]
async fn test_failed_offer_keeps_link_and_next_trigger_retries() {
    init_tracing();
    let relay = LoopbackRelay::new();

    let p1 = TestPeer::join(&relay, "p1");
    relay.settle().await;
    let p2 = TestPeer::join(&relay, "p2");
    relay.settle().await;

    let p2_pc = p2.factory.pc_to("p1");
    let p1_pc = p1.factory.pc_to("p2");

    p2_pc.fail_next_offer();
    p2_pc.emit(PeerConnectionEvent::NegotiationNeeded);
    relay.settle().await;

    assert_eq!(p2.link_state("p1"), Some(LinkState::Stable));
    assert_eq!(p2_pc.signaling_state(), SignalingState::Stable);
    assert_eq!(p1_pc.remote_offers(), 1);

    p2_pc.emit(PeerConnectionEvent::NegotiationNeeded);
    relay.settle().await;

    assert_eq!(p1_pc.remote_offers(), 2);
    assert_eq!(p2_pc.remote_answers(), 2);
    assert_eq!(p2.client.sessions().link_count(), 1);
}

#[tokio::test]
async fn test_rejected_remote_offer_is_rolled_back() {
    init_tracing();
    let relay = LoopbackRelay::new();

    let p1 = TestPeer::join(&relay, "p1");
    relay.settle().await;
    let p2 = TestPeer::join(&relay, "p2");
    relay.settle().await;

    let p1_pc = p1.factory.pc_to("p2");
    let p2_pc = p2.factory.pc_to("p1");

    p1_pc.fail_next_remote_description();
    p2_pc.emit(PeerConnectionEvent::NegotiationNeeded);
    relay.settle().await;

    // p1 could not apply the offer and told p2, which dropped it
    assert_eq!(p1.link_state("p2"), Some(LinkState::Stable));
    assert_eq!(p1_pc.signaling_state(), SignalingState::Stable);
    assert_eq!(p2_pc.signaling_state(), SignalingState::Stable);
    assert_eq!(p2.link_state("p1"), Some(LinkState::Stable));
    assert_eq!(p2_pc.rollbacks(), 1);
    assert_eq!(p1.client.sessions().link_count(), 1);

    let answers_before = p2_pc.remote_answers();
    p2_pc.emit(PeerConnectionEvent::NegotiationNeeded);
    relay.settle().await;

    assert_eq!(p2_pc.remote_answers(), answers_before + 1);
    assert_eq!(p2_pc.signaling_state(), SignalingState::Stable);
    assert_eq!(p1_pc.signaling_state(), SignalingState::Stable);
}

#[tokio::test]
async fn test_rejection_without_outstanding_offer_is_ignored() {
    init_tracing();
    let relay = LoopbackRelay::new();

    let p1 = TestPeer::join(&relay, "p1");
    relay.settle().await;
    let p2 = TestPeer::join(&relay, "p2");
    relay.settle().await;

    let p1_pc = p1.factory.pc_to("p2");
    relay.inject(
        "p1",
        ServerMessage::NegotiationFailed {
            from: PeerId::from("p2"),
        },
    );
    relay.settle().await;

    assert_eq!(p1.link_state("p2"), Some(LinkState::Stable));
    assert_eq!(p1_pc.signaling_state(), SignalingState::Stable);
    assert_eq!(p1_pc.rollbacks(), 0);
}
