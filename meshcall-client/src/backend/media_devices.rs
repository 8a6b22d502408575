use crate::backend::LocalTrack;
use crate::error::MediaError;
use async_trait::async_trait;
use meshcall_core::MediaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    AudioInput,
    VideoInput,
}

impl DeviceKind {
    pub fn media_kind(self) -> MediaKind {
        match self {
            DeviceKind::AudioInput => MediaKind::Mic,
            DeviceKind::VideoInput => MediaKind::Camera,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub kind: DeviceKind,
    pub label: String,
}

/// Capture device access. `None` as a device id means the system default.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn open_microphone(&self, device_id: Option<&str>) -> Result<LocalTrack, MediaError>;

    async fn open_camera(&self, device_id: Option<&str>) -> Result<LocalTrack, MediaError>;

    /// Prompts for a screen, window or tab. Dismissing the prompt is
    /// `PermissionDenied(MediaKind::Screen)`.
    async fn open_display(&self) -> Result<LocalTrack, MediaError>;

    async fn enumerate(&self) -> Result<Vec<DeviceInfo>, MediaError>;
}
