use meshcall_core::{ClientMessage, MediaKind, PeerId, ServerMessage};

use crate::integration::init_tracing;
use crate::utils::{TestClient, spawn_hub, test_config};

#[tokio::test]
async fn test_toggle_media_is_broadcast_and_persisted() {
    init_tracing();

    let (addr, _hub) = spawn_hub(test_config()).await.expect("Hub failed to start");
    let mut p1 = TestClient::connect(addr, "p1").await.unwrap();
    p1.join("R1").await.unwrap();
    let mut p2 = TestClient::connect(addr, "p2").await.unwrap();
    p2.join("R1").await.unwrap();

    // The wire accepts the long name too
    p2.send_raw(r#"{"type":"toggle-media","kind":"microphone","enabled":false}"#)
        .await
        .unwrap();

    let toggled = p1
        .recv_until(|m| matches!(m, ServerMessage::MediaToggled { .. }))
        .await
        .unwrap();
    assert_eq!(
        toggled,
        ServerMessage::MediaToggled {
            peer_id: PeerId::from("p2"),
            kind: MediaKind::Mic,
            enabled: false,
        }
    );
    p2.expect_silence().await.unwrap();

    p2.send(&ClientMessage::ToggleMedia {
        kind: MediaKind::Camera,
        enabled: false,
    })
    .await
    .unwrap();
    p1.recv_until(|m| matches!(m, ServerMessage::MediaToggled { .. }))
        .await
        .unwrap();

    // A late joiner sees the current state
    let mut p3 = TestClient::connect(addr, "p3").await.unwrap();
    match p3.join("R1").await.unwrap() {
        ServerMessage::Peers { peers, .. } => {
            let p2_info = peers
                .iter()
                .find(|p| p.peer_id == PeerId::from("p2"))
                .expect("p2 missing");
            assert!(!p2_info.media_state.mic);
            assert!(!p2_info.media_state.camera);
            assert!(!p2_info.media_state.screen);
        }
        other => panic!("expected peers, got {:?}", other),
    }
}
