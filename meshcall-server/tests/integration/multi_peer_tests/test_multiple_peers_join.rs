use meshcall_core::{MediaState, PeerId, ServerMessage};

use crate::integration::init_tracing;
use crate::utils::{TestClient, spawn_hub, test_config};

#[tokio::test]
async fn test_multiple_peers_join() {
    init_tracing();

    let (addr, _hub) = spawn_hub(test_config()).await.expect("Hub failed to start");

    let mut p1 = TestClient::connect(addr, "p1").await.unwrap();
    p1.join("R1").await.unwrap();

    let mut p2 = TestClient::connect(addr, "p2").await.unwrap();
    let peers = p2.join("R1").await.unwrap();

    // The joiner sees who is already there
    match peers {
        ServerMessage::Peers { peers, .. } => {
            assert_eq!(peers.len(), 1);
            assert_eq!(peers[0].peer_id, PeerId::from("p1"));
            assert_eq!(peers[0].display_name, "Guest");
            assert_eq!(peers[0].media_state, MediaState::default());
        }
        other => panic!("expected peers, got {:?}", other),
    }

    // And the room hears about the joiner
    match p1.recv().await.unwrap() {
        ServerMessage::PeerJoined { participant } => {
            assert_eq!(participant.peer_id, PeerId::from("p2"));
        }
        other => panic!("expected peer-joined, got {:?}", other),
    }

    p2.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    init_tracing();

    let (addr, _hub) = spawn_hub(test_config()).await.expect("Hub failed to start");

    let mut a = TestClient::connect(addr, "a").await.unwrap();
    a.join("R1").await.unwrap();

    let mut b = TestClient::connect(addr, "b").await.unwrap();
    let peers = b.join("R2").await.unwrap();

    assert!(matches!(peers, ServerMessage::Peers { peers, .. } if peers.is_empty()));
    a.expect_silence().await.unwrap();
}
