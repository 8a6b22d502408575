use crate::backend::{EncodingParameters, PeerConnection, TransceiverId, TransceiverSlot};
use crate::engine::LinkState;
use crate::engine::peer_link::{LinkContext, LinkHandle, PeerLink};
use crate::error::SessionError;
use meshcall_core::PeerId;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

impl PeerLink {
    /// Creates the connection with its three transceivers, binds whatever
    /// local media is live right now and starts the link task.
    pub(crate) async fn spawn(ctx: &LinkContext, remote_id: PeerId) -> Result<LinkHandle, SessionError> {
        let (pc_events_tx, pc_events_rx) = mpsc::unbounded_channel();
        let pc = ctx
            .factory
            .create(&remote_id, &ctx.ice_servers, pc_events_tx)
            .await?;

        let (transceivers, active_screen) = match Self::prepare(ctx, pc.as_ref()).await {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("Failed to set up connection to {}: {}", remote_id, e);
                pc.close().await;
                return Err(e);
            }
        };

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let state = Arc::new(watch::channel(LinkState::New).0);

        let link = PeerLink {
            local_id: ctx.local_id.clone(),
            remote_id: remote_id.clone(),
            pc: pc.clone(),
            transceivers,
            signaling: ctx.signaling.clone(),
            events: ctx.events.clone(),
            state: state.clone(),
            making_offer: false,
            ignore_offer: false,
            negotiated: false,
            has_remote_description: false,
            pending_candidates: Vec::new(),
            announced_screens: HashSet::new(),
        };

        info!(
            "Opened link to {} ({})",
            remote_id,
            if link.is_initiator() { "initiator" } else { "awaiting offer" }
        );
        let task = tokio::spawn(link.run(commands_rx, pc_events_rx, active_screen));

        Ok(LinkHandle {
            remote_id,
            pc,
            commands: commands_tx,
            state,
            events: ctx.events.clone(),
            task,
        })
    }

    async fn prepare(
        ctx: &LinkContext,
        pc: &dyn PeerConnection,
    ) -> Result<([TransceiverId; 3], Option<String>), SessionError> {
        let audio = pc.add_transceiver(TransceiverSlot::Audio.track_kind()).await?;
        let camera = pc.add_transceiver(TransceiverSlot::Camera.track_kind()).await?;
        let screen = pc.add_transceiver(TransceiverSlot::Screen.track_kind()).await?;
        let transceivers = [audio, camera, screen];

        let (tracks, quality) = {
            let media = ctx.media.lock();
            let tracks = TransceiverSlot::ALL.map(|slot| media.track(slot).cloned());
            (tracks, media.screen_quality)
        };

        for (slot, track) in TransceiverSlot::ALL.into_iter().zip(tracks.iter()) {
            if let Some(track) = track {
                pc.replace_track(transceivers[slot.index()], Some(track.clone()))
                    .await?;
            }
        }

        let active_screen = tracks[TransceiverSlot::Screen.index()]
            .as_ref()
            .map(|track| track.id().to_owned());
        if active_screen.is_some() {
            pc.set_encoding_parameters(screen, EncodingParameters::from(quality))
                .await?;
        }

        Ok((transceivers, active_screen))
    }
}
