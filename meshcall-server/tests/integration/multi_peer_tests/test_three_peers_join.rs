use meshcall_core::{Identity, PeerId, ServerMessage};

use crate::integration::init_tracing;
use crate::utils::{TestClient, spawn_hub, test_config};

#[tokio::test]
async fn test_three_peers_join() {
    init_tracing();

    let (addr, _hub) = spawn_hub(test_config()).await.expect("Hub failed to start");

    let mut clients = Vec::new();
    for (peer, name) in [("p1", "Ann"), ("p2", "Bob"), ("p3", "Cid")] {
        let mut client = TestClient::connect(addr, peer).await.unwrap();
        client
            .join_as(
                "R1",
                Identity::anonymous(PeerId::from(peer)).with_display_name(name),
            )
            .await
            .unwrap();
        clients.push(client);
    }

    // p1 saw p2 and p3 arrive, in order
    let mut seen = Vec::new();
    for _ in 0..2 {
        match clients[0].recv().await.unwrap() {
            ServerMessage::PeerJoined { participant } => {
                seen.push((participant.peer_id, participant.display_name))
            }
            other => panic!("expected peer-joined, got {:?}", other),
        }
    }
    assert_eq!(
        seen,
        vec![
            (PeerId::from("p2"), "Bob".to_owned()),
            (PeerId::from("p3"), "Cid".to_owned()),
        ]
    );

    // p3 left: the other two hear it exactly once
    let p3 = clients.pop().unwrap();
    p3.close().await.unwrap();

    for client in clients.iter_mut() {
        let left = client
            .recv_until(|m| matches!(m, ServerMessage::PeerLeft { .. }))
            .await
            .unwrap();
        assert_eq!(
            left,
            ServerMessage::PeerLeft {
                peer_id: PeerId::from("p3")
            }
        );
        client.expect_silence().await.unwrap();
    }
}
