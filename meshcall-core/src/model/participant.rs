use crate::model::media::MediaState;
use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};

/// Who is joining: the peer id plus the identity supplied by the external
/// account backend, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub peer_id: PeerId,
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub media_state: Option<MediaState>,
}

impl Identity {
    pub fn anonymous(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            user_id: None,
            display_name: None,
            media_state: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Public view of a room participant, as sent to other clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub peer_id: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub media_state: MediaState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: String,
    pub sender_id: PeerId,
    pub sender_name: String,
    pub message: String,
    pub timestamp: u64,
}
