use crate::error::HubError;
use crate::store::ConnectionId;
use meshcall_core::{ChatEntry, Identity, MediaKind, ParticipantInfo, PeerId, ServerMessage};
use tokio::sync::oneshot;

/// What a joiner learns about the room it entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub peers: Vec<ParticipantInfo>,
    pub raised_hands: Vec<PeerId>,
    pub chat: Vec<ChatEntry>,
}

/// Commands delivered to a room actor.
///
/// Everything except `Join` and `GraceExpired` is ignored unless `connection`
/// is the active connection of `peer_id` in this room.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        identity: Identity,
        connection: ConnectionId,
        reply: oneshot::Sender<Result<JoinOutcome, HubError>>,
    },

    /// Explicit `leave`: the participant is removed at once.
    Leave {
        peer_id: PeerId,
        connection: ConnectionId,
    },

    /// The socket went away. The record is kept inactive for the grace period.
    Disconnect {
        peer_id: PeerId,
        connection: ConnectionId,
    },

    /// Point-to-point when `to` is set, otherwise to everyone else.
    Relay {
        from: PeerId,
        connection: ConnectionId,
        to: Option<PeerId>,
        message: ServerMessage,
    },

    ToggleMedia {
        peer_id: PeerId,
        connection: ConnectionId,
        kind: MediaKind,
        enabled: bool,
    },

    RaiseHand {
        peer_id: PeerId,
        connection: ConnectionId,
        raised: bool,
    },

    Chat {
        peer_id: PeerId,
        connection: ConnectionId,
        message: String,
    },

    Speaking {
        peer_id: PeerId,
        connection: ConnectionId,
        speaking: bool,
    },

    ListParticipants {
        peer_id: PeerId,
        connection: ConnectionId,
        reply: oneshot::Sender<Result<Vec<ParticipantInfo>, HubError>>,
    },

    Heartbeat {
        peer_id: PeerId,
        connection: ConnectionId,
    },

    GraceExpired {
        peer_id: PeerId,
        connection: ConnectionId,
    },
}
