use meshcall_core::{PeerId, ServerMessage};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{TestClient, spawn_hub, test_config};

#[tokio::test]
async fn test_heartbeat_evicts_silent_peer() {
    init_tracing();

    let config = meshcall_server::HubConfig {
        heartbeat_interval: Duration::from_millis(200),
        ..test_config()
    };
    let (addr, _hub) = spawn_hub(config).await.expect("Hub failed to start");

    let mut silent = TestClient::connect(addr, "p1").await.unwrap();
    silent.join("R1").await.unwrap();

    let mut watcher = TestClient::connect(addr, "p2").await.unwrap();
    watcher.join("R1").await.unwrap();

    // p1 stops reading, so it never answers a ping. p2 keeps reading.
    let left = watcher
        .recv_until(|m| matches!(m, ServerMessage::PeerLeft { .. }))
        .await
        .expect("p1 was never evicted");

    assert_eq!(
        left,
        ServerMessage::PeerLeft {
            peer_id: PeerId::from("p1")
        }
    );

    silent.expect_closed().await.expect("p1 connection still open");
}
