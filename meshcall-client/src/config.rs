use meshcall_core::utils::DEFAULT_SIGNALING_PATH;
use meshcall_core::{PeerId, RoomId};
use std::time::Duration;

/// Reconnect schedule of the signaling transport.
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Full WebSocket URL of the hub, e.g. `ws://localhost:7673/ws/signaling`.
    pub signaling_url: String,
    pub room_id: RoomId,
    pub peer_id: PeerId,
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub backoff: BackoffConfig,
}

impl ClientConfig {
    pub fn new(server: &str, room_id: impl Into<RoomId>) -> Self {
        Self {
            signaling_url: format!("{}{}", server.trim_end_matches('/'), DEFAULT_SIGNALING_PATH),
            room_id: room_id.into(),
            peer_id: PeerId::new(),
            user_id: None,
            display_name: None,
            backoff: BackoffConfig::default(),
        }
    }

    pub fn with_peer_id(mut self, peer_id: impl Into<PeerId>) -> Self {
        self.peer_id = peer_id.into();
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}
