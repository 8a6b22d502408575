use meshcall_core::ServerMessage;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{TestClient, spawn_hub, test_config};

#[tokio::test]
async fn test_connection_that_never_joins_gets_notice() {
    init_tracing();

    let config = meshcall_server::HubConfig {
        join_timeout: Duration::from_millis(100),
        ..test_config()
    };
    let (addr, _hub) = spawn_hub(config).await.expect("Hub failed to start");

    let mut client = TestClient::connect(addr, "p1").await.unwrap();

    let notice = client.recv().await.expect("No join-timeout notice");
    assert_eq!(notice, ServerMessage::JoinTimeout);

    // Sent once, and the connection stays usable
    client.expect_silence().await.unwrap();
    client.join("R1").await.expect("Join after notice failed");
}

#[tokio::test]
async fn test_joined_connection_gets_no_notice() {
    init_tracing();

    let config = meshcall_server::HubConfig {
        join_timeout: Duration::from_millis(100),
        ..test_config()
    };
    let (addr, _hub) = spawn_hub(config).await.expect("Hub failed to start");

    let mut client = TestClient::connect(addr, "p1").await.unwrap();
    client.join("R1").await.unwrap();

    client.expect_silence().await.unwrap();
}
