//! Local capture and what every peer link sends.

mod local_media;
mod quality;

pub use local_media::{LocalMediaState, LocalStream};
pub(crate) use local_media::SharedLocalMedia;

use crate::backend::{DeviceInfo, EncodingParameters, LocalTrack, MediaDevices, TransceiverSlot};
use crate::engine::{CallEvent, SessionManager};
use crate::error::MediaError;
use crate::transport::SignalingTransport;
use meshcall_core::{ClientMessage, MediaKind, MediaState, ScreenQuality, ScreenShareInfo};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Acquires and releases capture devices and keeps every link's outbound
/// tracks in line with them. Changes never renegotiate: tracks are swapped
/// on the fixed transceivers.
pub struct MediaController {
    devices: Arc<dyn MediaDevices>,
    sessions: Arc<SessionManager>,
    signaling: Arc<dyn SignalingTransport>,
    state: SharedLocalMedia,
    /// Serializes mutating operations.
    op_lock: tokio::sync::Mutex<()>,
    screen_watch: Mutex<Option<JoinHandle<()>>>,
    this: Weak<MediaController>,
}

impl MediaController {
    pub(crate) fn new(
        devices: Arc<dyn MediaDevices>,
        sessions: Arc<SessionManager>,
        signaling: Arc<dyn SignalingTransport>,
        state: SharedLocalMedia,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            devices,
            sessions,
            signaling,
            state,
            op_lock: tokio::sync::Mutex::new(()),
            screen_watch: Mutex::new(None),
            this: this.clone(),
        })
    }

    pub fn local_stream(&self) -> LocalStream {
        self.state.lock().stream()
    }

    pub fn media_state(&self) -> MediaState {
        self.state.lock().media_state()
    }

    pub fn screen_quality(&self) -> ScreenQuality {
        self.state.lock().screen_quality
    }

    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>, MediaError> {
        self.devices.enumerate().await
    }

    pub async fn enable_camera(&self, device_id: Option<&str>) -> Result<(), MediaError> {
        let _guard = self.op_lock.lock().await;
        if self.state.lock().camera.is_some() {
            debug!("Camera already enabled");
            return Ok(());
        }

        let device_id = device_id
            .map(str::to_owned)
            .or_else(|| self.state.lock().camera_device.clone());
        let track = self.devices.open_camera(device_id.as_deref()).await?;
        self.install(TransceiverSlot::Camera, track, device_id).await;
        Ok(())
    }

    pub async fn disable_camera(&self) {
        let _guard = self.op_lock.lock().await;
        self.remove(TransceiverSlot::Camera).await;
    }

    pub async fn enable_mic(&self, device_id: Option<&str>) -> Result<(), MediaError> {
        let _guard = self.op_lock.lock().await;
        if self.state.lock().audio.is_some() {
            debug!("Microphone already enabled");
            return Ok(());
        }

        let device_id = device_id
            .map(str::to_owned)
            .or_else(|| self.state.lock().mic_device.clone());
        let track = self.devices.open_microphone(device_id.as_deref()).await?;
        self.install(TransceiverSlot::Audio, track, device_id).await;
        Ok(())
    }

    pub async fn disable_mic(&self) {
        let _guard = self.op_lock.lock().await;
        self.remove(TransceiverSlot::Audio).await;
    }

    /// Dismissing the picker returns an error for which
    /// [`MediaError::is_screen_share_cancelled`] holds; nothing changes.
    pub async fn enable_screen_share(&self) -> Result<(), MediaError> {
        let _guard = self.op_lock.lock().await;
        if self.state.lock().screen.is_some() {
            debug!("Screen share already running");
            return Ok(());
        }

        let track = self.devices.open_display().await?;
        let track_id = track.id().to_owned();
        let quality = self.state.lock().screen_quality;

        self.install(TransceiverSlot::Screen, track.clone(), None)
            .await;
        self.sessions
            .apply_screen_encoding(EncodingParameters::from(quality));
        self.send(ClientMessage::ScreenStart {
            to: None,
            data: Some(ScreenShareInfo {
                track_id: Some(track_id),
            }),
        })
        .await;
        self.watch_screen(track);
        Ok(())
    }

    pub async fn disable_screen_share(&self) {
        let _guard = self.op_lock.lock().await;
        if let Some(watch) = self.take_screen_watch() {
            watch.abort();
        }
        self.stop_screen_share().await;
    }

    /// Moves an active mic or camera to another device. For a kind that is
    /// off, only the preference is stored.
    ///
    /// If the new device cannot be opened the previous one is reopened.
    pub async fn switch_device(&self, kind: MediaKind, device_id: &str) -> Result<(), MediaError> {
        let slot = match kind {
            MediaKind::Mic => TransceiverSlot::Audio,
            MediaKind::Camera => TransceiverSlot::Camera,
            MediaKind::Screen => {
                return Err(MediaError::DeviceUnavailable {
                    kind,
                    reason: "screen capture has no selectable device".into(),
                });
            }
        };

        let _guard = self.op_lock.lock().await;
        let (previous, previous_device) = {
            let mut state = self.state.lock();
            let previous = state.track_mut(slot).take();
            let device = match slot {
                TransceiverSlot::Audio => &mut state.mic_device,
                _ => &mut state.camera_device,
            };
            let previous_device = device.clone();
            if previous.is_none() {
                *device = Some(device_id.to_owned());
            }
            (previous, previous_device)
        };

        let Some(previous) = previous else {
            debug!("{} is off, stored device preference {}", kind, device_id);
            return Ok(());
        };

        // The device is exclusive: release before acquiring.
        previous.stop();

        match self.open(slot, Some(device_id)).await {
            Ok(track) => {
                info!("Switched {} to {}", kind, device_id);
                self.install(slot, track, Some(device_id.to_owned())).await;
                Ok(())
            }
            Err(e) => {
                warn!("Could not open {} device {}: {}", kind, device_id, e);
                match self.open(slot, previous_device.as_deref()).await {
                    Ok(track) => self.install(slot, track, previous_device).await,
                    Err(restore) => {
                        warn!("Could not reopen previous {} device: {}", kind, restore);
                        self.sessions.replace_track(slot, None).await;
                        self.publish(kind, false).await;
                    }
                }
                Err(e)
            }
        }
    }

    pub async fn set_screen_quality(&self, quality: ScreenQuality) {
        let _guard = self.op_lock.lock().await;
        let sharing = {
            let mut state = self.state.lock();
            state.screen_quality = quality;
            state.screen.is_some()
        };
        info!("Screen quality set to {:?}", quality);
        if sharing {
            self.sessions
                .apply_screen_encoding(EncodingParameters::from(quality));
        }
    }

    /// Stops every capture. Links are expected to be gone already.
    pub async fn release_all(&self) {
        let _guard = self.op_lock.lock().await;
        if let Some(watch) = self.take_screen_watch() {
            watch.abort();
        }
        let tracks = {
            let mut state = self.state.lock();
            [state.audio.take(), state.camera.take(), state.screen.take()]
        };
        for track in tracks.into_iter().flatten() {
            track.stop();
        }
        self.emit_stream();
    }

    async fn open(&self, slot: TransceiverSlot, device_id: Option<&str>) -> Result<LocalTrack, MediaError> {
        match slot {
            TransceiverSlot::Audio => self.devices.open_microphone(device_id).await,
            TransceiverSlot::Camera => self.devices.open_camera(device_id).await,
            TransceiverSlot::Screen => self.devices.open_display().await,
        }
    }

    async fn install(&self, slot: TransceiverSlot, track: LocalTrack, device_id: Option<String>) {
        let previous = {
            let mut state = self.state.lock();
            let device_id = track.device_id().map(str::to_owned).or(device_id);
            match slot {
                TransceiverSlot::Audio => state.mic_device = device_id,
                TransceiverSlot::Camera => state.camera_device = device_id,
                TransceiverSlot::Screen => {}
            }
            state.track_mut(slot).replace(track.clone())
        };

        self.sessions.replace_track(slot, Some(track)).await;
        if let Some(previous) = previous {
            previous.stop();
        }
        self.publish(slot.media_kind(), true).await;
    }

    async fn remove(&self, slot: TransceiverSlot) {
        let track = self.state.lock().track_mut(slot).take();
        let Some(track) = track else {
            debug!("{} already disabled", slot.media_kind());
            return;
        };

        self.sessions.replace_track(slot, None).await;
        track.stop();
        self.publish(slot.media_kind(), false).await;
    }

    async fn stop_screen_share(&self) {
        let track = self.state.lock().screen.take();
        let Some(track) = track else {
            debug!("No screen share to stop");
            return;
        };

        self.sessions.replace_track(TransceiverSlot::Screen, None).await;
        track.stop();
        self.send(ClientMessage::ScreenStop {
            to: None,
            data: Some(ScreenShareInfo {
                track_id: Some(track.id().to_owned()),
            }),
        })
        .await;
        self.publish(MediaKind::Screen, false).await;
    }

    fn watch_screen(&self, track: LocalTrack) {
        let this = self.this.clone();
        let handle = tokio::spawn(async move {
            track.ended().await;
            if let Some(controller) = this.upgrade() {
                controller.on_screen_ended(track.id()).await;
            }
        });

        if let Some(old) = self
            .screen_watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            old.abort();
        }
    }

    fn take_screen_watch(&self) -> Option<JoinHandle<()>> {
        self.screen_watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// The capture ended outside the app.
    async fn on_screen_ended(&self, track_id: &str) {
        let _guard = self.op_lock.lock().await;
        let current = self.state.lock().screen.as_ref().map(|t| t.id().to_owned());
        if current.as_deref() != Some(track_id) {
            return;
        }

        info!("Screen share ended by the system");
        // Running on the watch task itself: drop the handle, don't abort it.
        drop(self.take_screen_watch());
        self.stop_screen_share().await;
        self.sessions.emit(CallEvent::LocalScreenShareEnded);
    }

    async fn publish(&self, kind: MediaKind, enabled: bool) {
        self.emit_stream();
        self.send(ClientMessage::ToggleMedia { kind, enabled }).await;
    }

    fn emit_stream(&self) {
        let stream = self.local_stream();
        self.sessions.emit(CallEvent::LocalStreamChanged(stream));
    }

    /// Best effort: while offline the state travels with the next join.
    async fn send(&self, msg: ClientMessage) {
        let kind = msg.kind();
        if let Err(e) = self.signaling.send(msg).await {
            debug!("Not sending {}: {}", kind, e);
        }
    }
}
