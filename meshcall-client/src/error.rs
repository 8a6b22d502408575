use meshcall_core::MediaKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("signaling connection is not open")]
    NotConnected,

    #[error("signaling transport has been shut down")]
    Closed,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures of a single peer session. None of them close the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("peer connection backend: {0}")]
    Backend(String),

    #[error("{operation} is not valid in signaling state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("peer link to {0} is closed")]
    LinkClosed(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(feature = "webrtc")]
impl From<webrtc::Error> for SessionError {
    fn from(e: webrtc::Error) -> Self {
        SessionError::Backend(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("permission to use the {0} was denied")]
    PermissionDenied(MediaKind),

    #[error("{kind} device unavailable: {reason}")]
    DeviceUnavailable { kind: MediaKind, reason: String },

    #[error("no such device: {0}")]
    UnknownDevice(String),

    #[error("capture backend: {0}")]
    Backend(String),
}

impl MediaError {
    /// The user dismissed the screen picker.
    pub fn is_screen_share_cancelled(&self) -> bool {
        matches!(self, MediaError::PermissionDenied(MediaKind::Screen))
    }
}
