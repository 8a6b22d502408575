use crate::backend::{LocalTrack, RemoteTrack};
use crate::error::SessionError;
use async_trait::async_trait;
use meshcall_core::{IceCandidate, IceServerConfig, MediaKind, PeerId, SessionDescription, TrackKind};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Position of a transceiver in the connection's m-line order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransceiverId(pub usize);

/// The three transceivers every link carries, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransceiverSlot {
    Audio,
    Camera,
    Screen,
}

impl TransceiverSlot {
    pub const ALL: [TransceiverSlot; 3] = [
        TransceiverSlot::Audio,
        TransceiverSlot::Camera,
        TransceiverSlot::Screen,
    ];

    pub fn track_kind(self) -> TrackKind {
        match self {
            TransceiverSlot::Audio => TrackKind::Audio,
            TransceiverSlot::Camera | TransceiverSlot::Screen => TrackKind::Video,
        }
    }

    pub fn media_kind(self) -> MediaKind {
        match self {
            TransceiverSlot::Audio => MediaKind::Mic,
            TransceiverSlot::Camera => MediaKind::Camera,
            TransceiverSlot::Screen => MediaKind::Screen,
        }
    }

    pub fn index(self) -> usize {
        match self {
            TransceiverSlot::Audio => 0,
            TransceiverSlot::Camera => 1,
            TransceiverSlot::Screen => 2,
        }
    }

    /// Both ends create the same layout, so a remote m-line index maps to
    /// the slot at the same position.
    pub fn from_transceiver(id: TransceiverId) -> Option<Self> {
        Self::ALL.get(id.0).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalingState::Stable => "stable",
            SignalingState::HaveLocalOffer => "have-local-offer",
            SignalingState::HaveRemoteOffer => "have-remote-offer",
            SignalingState::HaveLocalPranswer => "have-local-pranswer",
            SignalingState::HaveRemotePranswer => "have-remote-pranswer",
            SignalingState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Sender encoding limits for one transceiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingParameters {
    pub max_bitrate_bps: u32,
    pub scale_resolution_down_by: f64,
}

#[derive(Debug, Clone)]
pub enum PeerConnectionEvent {
    IceCandidate(IceCandidate),
    Track {
        transceiver: Option<TransceiverId>,
        track: RemoteTrack,
    },
    NegotiationNeeded,
    ConnectionState(ConnectionState),
}

/// One WebRTC peer connection.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Adds a send/receive transceiver; ids are assigned in call order.
    async fn add_transceiver(&self, kind: TrackKind) -> Result<TransceiverId, SessionError>;

    async fn create_offer(&self) -> Result<SessionDescription, SessionError>;

    async fn create_answer(&self) -> Result<SessionDescription, SessionError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), SessionError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), SessionError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SessionError>;

    /// Swaps the outbound track without renegotiation. `None` sends nothing.
    async fn replace_track(
        &self,
        transceiver: TransceiverId,
        track: Option<LocalTrack>,
    ) -> Result<(), SessionError>;

    async fn set_encoding_parameters(
        &self,
        transceiver: TransceiverId,
        params: EncodingParameters,
    ) -> Result<(), SessionError>;

    fn signaling_state(&self) -> SignalingState;

    async fn close(&self);
}

#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(
        &self,
        remote: &PeerId,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<PeerConnectionEvent>,
    ) -> Result<Arc<dyn PeerConnection>, SessionError>;
}
