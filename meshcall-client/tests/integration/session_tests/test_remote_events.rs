use meshcall_client::CallEvent;
use meshcall_core::{ChatEntry, MediaKind, PeerId, ServerMessage};

use crate::utils::{LoopbackRelay, TestPeer, init_tracing, wait_until};

#[tokio::test]
async fn test_room_activity_surfaces_as_events() {
    init_tracing();
    let relay = LoopbackRelay::new();

    let mut p1 = TestPeer::join(&relay, "p1");
    relay.settle().await;
    let p2 = TestPeer::join(&relay, "p2");
    relay.settle().await;
    p1.drain_events();

    p2.client.media().enable_mic(None).await.unwrap();
    relay.inject(
        "p1",
        ServerMessage::HandRaised {
            peer_id: PeerId::from("p2"),
            raised: true,
        },
    );
    relay.inject(
        "p1",
        ServerMessage::Chat {
            entry: ChatEntry {
                id: "c1".into(),
                sender_id: PeerId::from("p2"),
                sender_name: "Guest".into(),
                message: "hi".into(),
                timestamp: 1,
            },
        },
    );
    relay.inject(
        "p1",
        ServerMessage::Speaking {
            peer_id: PeerId::from("p2"),
            speaking: true,
        },
    );
    relay.inject("p1", ServerMessage::JoinTimeout);
    relay.settle().await;

    let mut seen = Vec::new();
    wait_until("room events", || {
        seen.extend(p1.drain_events());
        seen.iter().any(|e| matches!(e, CallEvent::JoinTimeout))
    })
    .await;

    assert!(seen.iter().any(|e| matches!(e,
        CallEvent::RemoteMediaToggled { peer_id, kind: MediaKind::Mic, enabled: true }
            if *peer_id == PeerId::from("p2"))));
    assert!(seen.iter().any(|e| matches!(e, CallEvent::HandRaised { raised: true, .. })));
    assert!(seen.iter().any(|e| matches!(e, CallEvent::ChatMessage(entry) if entry.message == "hi")));
    assert!(seen.iter().any(|e| matches!(e, CallEvent::Speaking { speaking: true, .. })));
}

#[tokio::test]
async fn test_ice_config_reaches_factory() {
    init_tracing();
    let relay = LoopbackRelay::new();

    let p1 = TestPeer::join(&relay, "p1");
    relay.inject(
        "p1",
        ServerMessage::IceConfig {
            ice_servers: vec![meshcall_core::IceServerConfig {
                urls: vec!["turn:turn.example.org:3478".into()],
                username: Some("u".into()),
                credential: Some("c".into()),
            }],
        },
    );
    relay.settle().await;
    let _p2 = TestPeer::join(&relay, "p2");
    relay.settle().await;

    let pc = p1.factory.pc_to("p2");
    assert_eq!(pc.ice_servers.len(), 1);
    assert_eq!(pc.ice_servers[0].urls[0], "turn:turn.example.org:3478");
}
