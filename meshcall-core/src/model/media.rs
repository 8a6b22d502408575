use serde::{Deserialize, Serialize};
use std::fmt;

/// A user-facing media kind, as toggled in the UI and announced to the room.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Camera,
    #[serde(alias = "microphone")]
    Mic,
    Screen,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Camera => "camera",
            MediaKind::Mic => "mic",
            MediaKind::Screen => "screen",
        };
        f.write_str(name)
    }
}

/// Raw track kind as carried by a transceiver.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Which media a participant currently publishes.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
pub struct MediaState {
    pub camera: bool,
    pub mic: bool,
    pub screen: bool,
}

impl MediaState {
    pub fn set(&mut self, kind: MediaKind, enabled: bool) {
        match kind {
            MediaKind::Camera => self.camera = enabled,
            MediaKind::Mic => self.mic = enabled,
            MediaKind::Screen => self.screen = enabled,
        }
    }

    pub fn get(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Camera => self.camera,
            MediaKind::Mic => self.mic,
            MediaKind::Screen => self.screen,
        }
    }
}

impl Default for MediaState {
    /// A freshly joined participant is assumed to publish camera and mic.
    fn default() -> Self {
        Self {
            camera: true,
            mic: true,
            screen: false,
        }
    }
}

/// Outbound screen-share quality preset.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScreenQuality {
    Low,
    #[default]
    Medium,
    High,
}
