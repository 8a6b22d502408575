use meshcall_core::{ClientMessage, PeerId, ServerMessage, SessionDescription};

use crate::integration::init_tracing;
use crate::utils::{TestClient, spawn_hub, test_config};

#[tokio::test]
async fn test_offer_to_absent_peer_answers_unavailable() {
    init_tracing();

    let (addr, _hub) = spawn_hub(test_config()).await.expect("Hub failed to start");
    let mut p1 = TestClient::connect(addr, "p1").await.unwrap();
    p1.join("R1").await.unwrap();

    p1.send(&ClientMessage::Offer {
        to: Some(PeerId::from("ghost")),
        data: SessionDescription::offer("v=0"),
    })
    .await
    .unwrap();

    assert_eq!(
        p1.recv().await.unwrap(),
        ServerMessage::PeerUnavailable {
            peer_id: PeerId::from("ghost")
        }
    );
}

#[tokio::test]
async fn test_offer_to_disconnected_peer_answers_unavailable() {
    init_tracing();

    let (addr, _hub) = spawn_hub(test_config()).await.expect("Hub failed to start");
    let mut p1 = TestClient::connect(addr, "p1").await.unwrap();
    p1.join("R1").await.unwrap();
    let mut p2 = TestClient::connect(addr, "p2").await.unwrap();
    p2.join("R1").await.unwrap();

    p2.close().await.unwrap();
    p1.recv_until(|m| matches!(m, ServerMessage::PeerLeft { .. }))
        .await
        .unwrap();

    // p2's record is still inside its grace window, but inactive
    p1.send(&ClientMessage::Offer {
        to: Some(PeerId::from("p2")),
        data: SessionDescription::offer("v=0"),
    })
    .await
    .unwrap();

    assert_eq!(
        p1.recv().await.unwrap(),
        ServerMessage::PeerUnavailable {
            peer_id: PeerId::from("p2")
        }
    );
}
