use crate::backend::{RemoteTrack, TransceiverId};
use crate::engine::CallEvent;
use crate::engine::classify::classify_remote_track;
use crate::engine::peer_link::PeerLink;
use meshcall_core::{ClientMessage, ScreenShareInfo};
use tracing::{debug, info};

impl PeerLink {
    pub(super) fn handle_remote_track(&self, transceiver: Option<TransceiverId>, track: RemoteTrack) {
        let kind = classify_remote_track(&track, transceiver, &self.announced_screens);
        info!("Remote {:?} track {} from {}", kind, track.id, self.remote_id);
        let _ = self.events.send(CallEvent::RemoteTrack {
            peer_id: self.remote_id.clone(),
            kind,
            track,
        });
    }

    pub(super) fn handle_screen_started(&mut self, track_id: Option<String>) {
        if let Some(track_id) = track_id {
            self.announced_screens.insert(track_id);
        }
    }

    /// Tells a newly linked peer about a screen share already running.
    pub(super) async fn announce_screen(&self, track_id: String) {
        let msg = ClientMessage::ScreenStart {
            to: Some(self.remote_id.clone()),
            data: Some(ScreenShareInfo {
                track_id: Some(track_id),
            }),
        };
        if let Err(e) = self.send(msg).await {
            debug!("Could not announce screen share to {}: {}", self.remote_id, e);
        }
    }
}
