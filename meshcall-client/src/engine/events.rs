use crate::backend::RemoteTrack;
use crate::media::LocalStream;
use meshcall_core::{ChatEntry, MediaKind, ParticipantInfo, PeerId};

/// Lifecycle of one peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    New,
    Offering,
    Stable,
    /// Terminal. A new link is created if the peer shows up again.
    Closed,
}

/// What an inbound track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteMediaKind {
    Audio,
    Camera,
    Screen,
}

/// Everything the call surfaces to the UI.
#[derive(Debug, Clone)]
pub enum CallEvent {
    SignalingConnected,
    SignalingDisconnected,
    Joined {
        peers: Vec<ParticipantInfo>,
        raised_hands: Vec<PeerId>,
        chat: Vec<ChatEntry>,
    },
    JoinTimeout,
    ParticipantJoined(ParticipantInfo),
    ParticipantLeft(PeerId),
    Participants(Vec<ParticipantInfo>),
    LinkStateChanged {
        peer_id: PeerId,
        state: LinkState,
    },
    RemoteTrack {
        peer_id: PeerId,
        kind: RemoteMediaKind,
        track: RemoteTrack,
    },
    ScreenShareStarted {
        peer_id: PeerId,
        track_id: Option<String>,
    },
    ScreenShareStopped {
        peer_id: PeerId,
    },
    RemoteMediaToggled {
        peer_id: PeerId,
        kind: MediaKind,
        enabled: bool,
    },
    HandRaised {
        peer_id: PeerId,
        raised: bool,
    },
    ChatMessage(ChatEntry),
    Speaking {
        peer_id: PeerId,
        speaking: bool,
    },
    LocalStreamChanged(LocalStream),
    /// The screen share ended from outside the app, e.g. the OS "stop
    /// sharing" control.
    LocalScreenShareEnded,
}
