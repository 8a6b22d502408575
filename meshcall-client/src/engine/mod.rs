//! Per-peer media sessions and their negotiation.

use crate::backend::{EncodingParameters, LocalTrack, PeerConnectionFactory, TransceiverSlot};
use crate::error::SessionError;
use crate::media::SharedLocalMedia;
use crate::transport::SignalingTransport;
use dashmap::DashMap;
use meshcall_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use meshcall_core::{IceServerConfig, PeerId};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{error, warn};

mod classify;
mod create_link_impl;
mod events;
mod handle_candidate_impl;
mod handle_remote_offer_impl;
mod handle_signal_impl;
mod handle_track_impl;
mod negotiate_impl;
mod peer_link;

pub use classify::classify_remote_track;
pub use events::*;

use peer_link::{LinkCommand, LinkContext, LinkHandle, PeerLink};

/// Owns exactly one [`PeerLink`] per remote participant.
pub struct SessionManager {
    local_id: PeerId,
    factory: Arc<dyn PeerConnectionFactory>,
    signaling: Arc<dyn SignalingTransport>,
    media: SharedLocalMedia,
    events: broadcast::Sender<CallEvent>,
    ice_servers: RwLock<Vec<IceServerConfig>>,
    links: DashMap<PeerId, LinkHandle>,
}

impl SessionManager {
    pub(crate) fn new(
        local_id: PeerId,
        factory: Arc<dyn PeerConnectionFactory>,
        signaling: Arc<dyn SignalingTransport>,
        media: SharedLocalMedia,
        events: broadcast::Sender<CallEvent>,
    ) -> Self {
        Self {
            local_id,
            factory,
            signaling,
            media,
            events,
            ice_servers: RwLock::new(default_ice_servers()),
            links: DashMap::new(),
        }
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.events.subscribe()
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.ice_servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_ice_servers(&self, servers: Vec<IceServerConfig>) {
        *self
            .ice_servers
            .write()
            .unwrap_or_else(PoisonError::into_inner) = servers;
    }

    pub fn link_state(&self, peer_id: &PeerId) -> Option<LinkState> {
        self.links.get(peer_id).map(|link| link.state())
    }

    pub fn watch_link(&self, peer_id: &PeerId) -> Option<watch::Receiver<LinkState>> {
        self.links.get(peer_id).map(|link| link.subscribe())
    }

    /// Links that are not closed.
    pub fn link_count(&self) -> usize {
        self.links.iter().filter(|link| !link.is_closed()).count()
    }

    pub fn linked_peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self
            .links
            .iter()
            .filter(|link| !link.is_closed())
            .map(|link| link.key().clone())
            .collect();
        peers.sort();
        peers
    }

    pub(crate) fn emit(&self, event: CallEvent) {
        let _ = self.events.send(event);
    }

    fn has_live_link(&self, peer_id: &PeerId) -> bool {
        self.links
            .get(peer_id)
            .map(|link| !link.is_closed())
            .unwrap_or(false)
    }

    fn forward(&self, peer_id: &PeerId, cmd: LinkCommand) -> bool {
        match self.links.get(peer_id) {
            Some(link) => link.send(cmd),
            None => false,
        }
    }

    /// Replaces any link to `remote` with a fresh one.
    async fn open_link(&self, remote: PeerId) {
        self.close_link(&remote).await;

        let ctx = LinkContext {
            local_id: self.local_id.clone(),
            factory: self.factory.clone(),
            signaling: self.signaling.clone(),
            media: self.media.clone(),
            events: self.events.clone(),
            ice_servers: self.ice_servers(),
        };
        match PeerLink::spawn(&ctx, remote.clone()).await {
            Ok(handle) => {
                self.links.insert(remote, handle);
            }
            Err(e) => error!("Could not open link to {}: {}", remote, e),
        }
    }

    async fn close_link(&self, remote: &PeerId) {
        if let Some((_, link)) = self.links.remove(remote) {
            link.close().await;
        }
    }

    /// Closes every link, e.g. before rejoining after a reconnect.
    pub async fn reset(&self) {
        let peers: Vec<PeerId> = self.links.iter().map(|link| link.key().clone()).collect();
        for peer in peers {
            self.close_link(&peer).await;
        }
    }

    /// Puts `track` on the `slot` transceiver of every link. Links that fail
    /// are logged and skipped.
    pub(crate) async fn replace_track(&self, slot: TransceiverSlot, track: Option<LocalTrack>) {
        let mut acks = Vec::new();
        for link in self.links.iter() {
            let (ack, rx) = oneshot::channel();
            let cmd = LinkCommand::ReplaceTrack {
                slot,
                track: track.clone(),
                ack,
            };
            if link.send(cmd) {
                acks.push((link.key().clone(), rx));
            }
        }

        for (peer, rx) in acks {
            match rx.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Failed to replace {:?} track for {}: {}", slot, peer, e),
                Err(_) => warn!(
                    "Failed to replace {:?} track for {}: {}",
                    slot,
                    peer,
                    SessionError::LinkClosed(peer.to_string())
                ),
            }
        }
    }

    pub(crate) fn apply_screen_encoding(&self, params: EncodingParameters) {
        for link in self.links.iter() {
            link.send(LinkCommand::SetScreenEncoding(params));
        }
    }
}

fn default_ice_servers() -> Vec<IceServerConfig> {
    vec![IceServerConfig {
        urls: vec![DEFAULT_STUN_ADDR.to_string(), DEFAULT_STUN_ADDR_2.to_string()],
        username: None,
        credential: None,
    }]
}
