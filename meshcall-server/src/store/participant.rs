use meshcall_core::{MediaState, ParticipantInfo, PeerId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One WebSocket connection to some hub instance.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub peer_id: PeerId,
    pub user_id: Option<String>,
    pub display_name: String,
    pub media_state: MediaState,
    pub connection: ConnectionId,
    /// Unix millis of the last join, heartbeat or media change.
    pub last_seen: u64,
    pub is_active: bool,
}

impl Participant {
    pub fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            peer_id: self.peer_id.clone(),
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            media_state: self.media_state,
        }
    }

    /// Whether this record belongs to the same person as `user_id`.
    pub fn same_user(&self, user_id: Option<&str>) -> bool {
        matches!((self.user_id.as_deref(), user_id), (Some(a), Some(b)) if a == b)
    }
}
