use async_trait::async_trait;
use meshcall_client::MediaError;
use meshcall_client::backend::{DeviceInfo, DeviceKind, LocalTrack, MediaDevices};
use meshcall_core::{MediaKind, TrackKind};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub const DEFAULT_CAMERA: &str = "cam-0";
pub const DEFAULT_MIC: &str = "mic-0";

#[derive(Default)]
struct DevicesState {
    opened: Vec<LocalTrack>,
    broken: HashSet<String>,
    deny_screen: bool,
}

/// Capture devices that hand out inert tracks.
#[derive(Default)]
pub struct FakeDevices {
    state: Mutex<DevicesState>,
}

impl FakeDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Opening `device_id` fails from now on.
    pub fn break_device(&self, device_id: &str) {
        self.state.lock().unwrap().broken.insert(device_id.to_owned());
    }

    /// The user dismisses every screen picker from now on.
    pub fn deny_screen(&self) {
        self.state.lock().unwrap().deny_screen = true;
    }

    pub fn opened(&self) -> Vec<LocalTrack> {
        self.state.lock().unwrap().opened.clone()
    }

    /// Tracks on `device_id` that were opened and not stopped.
    pub fn live_on(&self, device_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .opened
            .iter()
            .filter(|t| t.device_id() == Some(device_id) && !t.is_stopped())
            .count()
    }

    pub fn last_screen(&self) -> Option<LocalTrack> {
        self.state
            .lock()
            .unwrap()
            .opened
            .iter()
            .rev()
            .find(|t| t.device_id().is_none())
            .cloned()
    }

    fn open(
        &self,
        kind: MediaKind,
        device_id: &str,
        track_kind: TrackKind,
        label: &str,
    ) -> Result<LocalTrack, MediaError> {
        let mut state = self.state.lock().unwrap();
        if state.broken.contains(device_id) {
            return Err(MediaError::DeviceUnavailable {
                kind,
                reason: format!("{device_id} is busy"),
            });
        }
        let track = LocalTrack::new(track_kind, label, Some(device_id.to_owned()));
        state.opened.push(track.clone());
        Ok(track)
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn open_microphone(&self, device_id: Option<&str>) -> Result<LocalTrack, MediaError> {
        let device_id = device_id.unwrap_or(DEFAULT_MIC);
        self.open(MediaKind::Mic, device_id, TrackKind::Audio, "Fake Microphone")
    }

    async fn open_camera(&self, device_id: Option<&str>) -> Result<LocalTrack, MediaError> {
        let device_id = device_id.unwrap_or(DEFAULT_CAMERA);
        self.open(MediaKind::Camera, device_id, TrackKind::Video, "Fake Camera")
    }

    async fn open_display(&self) -> Result<LocalTrack, MediaError> {
        let mut state = self.state.lock().unwrap();
        if state.deny_screen {
            return Err(MediaError::PermissionDenied(MediaKind::Screen));
        }
        let track = LocalTrack::new(TrackKind::Video, "Screen 1", None);
        state.opened.push(track.clone());
        Ok(track)
    }

    async fn enumerate(&self) -> Result<Vec<DeviceInfo>, MediaError> {
        Ok(vec![
            DeviceInfo {
                id: DEFAULT_MIC.into(),
                kind: DeviceKind::AudioInput,
                label: "Fake Microphone".into(),
            },
            DeviceInfo {
                id: DEFAULT_CAMERA.into(),
                kind: DeviceKind::VideoInput,
                label: "Fake Camera".into(),
            },
            DeviceInfo {
                id: "cam-1".into(),
                kind: DeviceKind::VideoInput,
                label: "Fake Camera 2".into(),
            },
        ])
    }
}
