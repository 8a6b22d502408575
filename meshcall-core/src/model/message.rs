use crate::model::media::{MediaKind, MediaState};
use crate::model::participant::{ChatEntry, Identity, ParticipantInfo};
use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use crate::model::signaling::{IceCandidate, IceServerConfig, ScreenShareInfo, SessionDescription};
use serde::{Deserialize, Serialize};

/// Messages a client sends to the hub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join {
        room_id: RoomId,
        peer_id: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_state: Option<MediaState>,
    },
    Leave,
    Offer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<PeerId>,
        data: SessionDescription,
    },
    Answer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<PeerId>,
        data: SessionDescription,
    },
    Candidate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<PeerId>,
        data: IceCandidate,
    },
    /// Tells the target its last offer could not be applied.
    NegotiationFailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<PeerId>,
    },
    ScreenStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<ScreenShareInfo>,
    },
    ScreenStop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<ScreenShareInfo>,
    },
    ToggleMedia {
        kind: MediaKind,
        enabled: bool,
    },
    RaiseHand {
        raised: bool,
    },
    Chat {
        message: String,
    },
    Speaking {
        speaking: bool,
    },
    RequestParticipants,
}

impl ClientMessage {
    pub fn join(room_id: RoomId, identity: &Identity) -> Self {
        ClientMessage::Join {
            room_id,
            peer_id: identity.peer_id.clone(),
            user_id: identity.user_id.clone(),
            display_name: identity.display_name.clone(),
            media_state: identity.media_state,
        }
    }

    /// Short name of the message kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Leave => "leave",
            ClientMessage::Offer { .. } => "offer",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::Candidate { .. } => "candidate",
            ClientMessage::NegotiationFailed { .. } => "negotiation-failed",
            ClientMessage::ScreenStart { .. } => "screen-start",
            ClientMessage::ScreenStop { .. } => "screen-stop",
            ClientMessage::ToggleMedia { .. } => "toggle-media",
            ClientMessage::RaiseHand { .. } => "raise-hand",
            ClientMessage::Chat { .. } => "chat",
            ClientMessage::Speaking { .. } => "speaking",
            ClientMessage::RequestParticipants => "request-participants",
        }
    }
}

/// Messages the hub sends to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    Peers {
        peers: Vec<ParticipantInfo>,
        #[serde(default)]
        raised_hands: Vec<PeerId>,
        #[serde(default)]
        chat: Vec<ChatEntry>,
    },
    PeerJoined {
        #[serde(flatten)]
        participant: ParticipantInfo,
    },
    PeerLeft {
        peer_id: PeerId,
    },
    PeerUnavailable {
        peer_id: PeerId,
    },
    Offer {
        from: PeerId,
        data: SessionDescription,
    },
    Answer {
        from: PeerId,
        data: SessionDescription,
    },
    Candidate {
        from: PeerId,
        data: IceCandidate,
    },
    NegotiationFailed {
        from: PeerId,
    },
    ScreenStart {
        from: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<ScreenShareInfo>,
    },
    ScreenStop {
        from: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<ScreenShareInfo>,
    },
    MediaToggled {
        peer_id: PeerId,
        kind: MediaKind,
        enabled: bool,
    },
    HandRaised {
        peer_id: PeerId,
        raised: bool,
    },
    Chat {
        #[serde(flatten)]
        entry: ChatEntry,
    },
    Speaking {
        peer_id: PeerId,
        speaking: bool,
    },
    Participants {
        participants: Vec<ParticipantInfo>,
    },
    JoinTimeout,
}
