use meshcall_core::IceServerConfig;
use meshcall_core::utils::{DEFAULT_SIGNALING_PATH, DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use std::net::SocketAddr;
use std::time::Duration;

/// Hub configuration.
#[derive(Clone, Debug)]
pub struct HubConfig {
    pub bind_addr: SocketAddr,
    /// HTTP path upgraded to the signaling WebSocket.
    pub signaling_path: String,
    /// Ping period. A connection that has not answered the previous ping by
    /// the next tick is closed.
    pub heartbeat_interval: Duration,
    /// How long a disconnected participant's record is kept before hard deletion.
    pub grace_period: Duration,
    /// A connection that has not joined a room by then gets a `join-timeout` notice.
    pub join_timeout: Duration,
    pub chat_history_limit: usize,
    /// Pushed to every client on connect as `ice-config`.
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 7673)),
            signaling_path: DEFAULT_SIGNALING_PATH.to_owned(),
            heartbeat_interval: Duration::from_secs(30),
            grace_period: Duration::from_secs(30),
            join_timeout: Duration::from_secs(10),
            chat_history_limit: 100,
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
                username: None,
                credential: None,
            }],
        }
    }
}
