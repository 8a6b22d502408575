use crate::backend::{LocalTrack, TransceiverSlot};
use meshcall_core::{MediaState, ScreenQuality};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The composite local stream as exposed to the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalStream {
    pub audio: Option<LocalTrack>,
    pub camera: Option<LocalTrack>,
    pub screen: Option<LocalTrack>,
}

#[derive(Debug, Default)]
pub struct LocalMediaState {
    pub audio: Option<LocalTrack>,
    pub camera: Option<LocalTrack>,
    pub screen: Option<LocalTrack>,
    pub mic_device: Option<String>,
    pub camera_device: Option<String>,
    pub screen_quality: ScreenQuality,
}

impl LocalMediaState {
    pub fn track(&self, slot: TransceiverSlot) -> Option<&LocalTrack> {
        match slot {
            TransceiverSlot::Audio => self.audio.as_ref(),
            TransceiverSlot::Camera => self.camera.as_ref(),
            TransceiverSlot::Screen => self.screen.as_ref(),
        }
    }

    pub(crate) fn track_mut(&mut self, slot: TransceiverSlot) -> &mut Option<LocalTrack> {
        match slot {
            TransceiverSlot::Audio => &mut self.audio,
            TransceiverSlot::Camera => &mut self.camera,
            TransceiverSlot::Screen => &mut self.screen,
        }
    }

    /// What the room is told this participant publishes.
    pub fn media_state(&self) -> MediaState {
        MediaState {
            camera: self.camera.is_some(),
            mic: self.audio.is_some(),
            screen: self.screen.is_some(),
        }
    }

    pub fn stream(&self) -> LocalStream {
        LocalStream {
            audio: self.audio.clone(),
            camera: self.camera.clone(),
            screen: self.screen.clone(),
        }
    }
}

/// Local media shared between the controller and every peer link.
///
/// The lock is never held across an await point.
#[derive(Clone, Default)]
pub(crate) struct SharedLocalMedia(Arc<Mutex<LocalMediaState>>);

impl SharedLocalMedia {
    pub(crate) fn lock(&self) -> MutexGuard<'_, LocalMediaState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
