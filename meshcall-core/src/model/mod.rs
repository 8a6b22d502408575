mod media;
mod message;
mod participant;
mod peer;
mod room;
mod signaling;

pub use media::{MediaKind, MediaState, ScreenQuality, TrackKind};
pub use message::{ClientMessage, ServerMessage};
pub use participant::{ChatEntry, Identity, ParticipantInfo};
pub use peer::PeerId;
pub use room::RoomId;
pub use signaling::{IceCandidate, IceServerConfig, ScreenShareInfo, SdpType, SessionDescription};
