use meshcall_core::{ClientMessage, MediaKind};

use crate::integration::init_tracing;
use crate::utils::{TestClient, spawn_hub, test_config};

#[tokio::test]
async fn test_malformed_messages_are_dropped() {
    init_tracing();

    let (addr, _hub) = spawn_hub(test_config()).await.expect("Hub failed to start");
    let mut client = TestClient::connect(addr, "p1").await.unwrap();

    client.send_raw("definitely not json").await.unwrap();
    client.send_raw(r#"{"type":"teleport","to":"p2"}"#).await.unwrap();
    client.send_raw(r#"{"type":"offer"}"#).await.unwrap();

    // Connection survives and still works
    client.join("R1").await.expect("Join after garbage failed");
}

#[tokio::test]
async fn test_messages_before_join_are_dropped() {
    init_tracing();

    let (addr, _hub) = spawn_hub(test_config()).await.expect("Hub failed to start");
    let mut early = TestClient::connect(addr, "p1").await.unwrap();
    let mut member = TestClient::connect(addr, "p2").await.unwrap();
    member.join("R1").await.unwrap();

    early
        .send(&ClientMessage::ToggleMedia {
            kind: MediaKind::Camera,
            enabled: false,
        })
        .await
        .unwrap();

    member.expect_silence().await.unwrap();
}
