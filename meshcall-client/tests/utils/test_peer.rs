use meshcall_client::{CallClient, CallEvent, ClientConfig, LinkState};
use meshcall_core::PeerId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use super::{FakeDevices, FakeFactory, LoopbackRelay};

/// Upper bound for any wait in these tests (ms).
pub const WAIT_TIMEOUT_MS: u64 = 5000;

pub const TEST_ROOM: &str = "R1";

/// A call client wired to fakes, with handles to inspect them.
pub struct TestPeer {
    pub client: CallClient,
    pub factory: Arc<FakeFactory>,
    pub devices: Arc<FakeDevices>,
    events: broadcast::Receiver<CallEvent>,
}

impl TestPeer {
    /// Joins the loopback room as `peer`.
    pub fn join(relay: &LoopbackRelay, peer: &str) -> Self {
        let (transport, transport_events) = relay.connect(peer);
        let factory = FakeFactory::new();
        let devices = FakeDevices::new();
        let config = ClientConfig::new("ws://loopback", TEST_ROOM).with_peer_id(peer);

        let client = CallClient::with_transport(
            config,
            transport,
            transport_events,
            factory.clone(),
            devices.clone(),
        );
        let events = client.subscribe();

        Self {
            client,
            factory,
            devices,
            events,
        }
    }

    pub fn link_state(&self, remote: &str) -> Option<LinkState> {
        self.client.sessions().link_state(&PeerId::from(remote))
    }

    /// Events received since the last call.
    pub fn drain_events(&mut self) -> Vec<CallEvent> {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => return events,
            }
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Polls `condition` until it holds or the wait times out.
pub async fn wait_until(what: &str, condition: impl FnMut() -> bool) {
    wait_until_within(what, WAIT_TIMEOUT_MS, condition).await
}

pub async fn wait_until_within(what: &str, timeout_ms: u64, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Waits until `client` has a link to `remote` in `state`.
pub async fn wait_for_link(client: &CallClient, remote: &str, state: LinkState) {
    let remote = PeerId::from(remote);
    wait_until(&format!("link to {remote} to be {state:?}"), || {
        client.sessions().link_state(&remote) == Some(state)
    })
    .await;
}
