use crate::backend::SignalingState;
use crate::engine::LinkState;
use crate::engine::peer_link::PeerLink;
use crate::error::SessionError;
use meshcall_core::{ClientMessage, SessionDescription};
use tracing::{debug, info, warn};

impl PeerLink {
    pub(super) async fn negotiate(&mut self) {
        if self.making_offer || self.link_state() == LinkState::Closed {
            return;
        }

        self.making_offer = true;
        self.set_state(LinkState::Offering);
        let result = self.send_offer().await;
        self.making_offer = false;

        if let Err(e) = result {
            warn!("Offer to {} failed: {}", self.remote_id, e);
            self.abort_attempt().await;
        }
    }

    async fn send_offer(&self) -> Result<(), SessionError> {
        let offer = self.pc.create_offer().await?;
        self.pc.set_local_description(offer.clone()).await?;
        debug!("Sending offer to {}", self.remote_id);
        self.send(ClientMessage::Offer {
            to: Some(self.remote_id.clone()),
            data: offer,
        })
        .await
    }

    /// Renegotiation requested by the connection itself.
    pub(super) async fn handle_negotiation_needed(&mut self) {
        // The first offer of a pair always comes from the initiator.
        if self.link_state() == LinkState::New && !self.is_initiator() {
            debug!("Ignoring negotiation-needed for {} before first offer", self.remote_id);
            return;
        }
        if self.pc.signaling_state() != SignalingState::Stable {
            debug!(
                "Deferring negotiation with {} in state {}",
                self.remote_id,
                self.pc.signaling_state()
            );
            return;
        }
        info!("Renegotiating with {}", self.remote_id);
        self.negotiate().await;
    }

    /// Drops a half-applied exchange and falls back to what the connection
    /// actually has. The link stays open.
    pub(super) async fn abort_attempt(&self) {
        match self.pc.signaling_state() {
            SignalingState::HaveLocalOffer | SignalingState::HaveRemoteOffer => {
                if let Err(e) = self
                    .pc
                    .set_local_description(SessionDescription::rollback())
                    .await
                {
                    warn!("Rollback with {} failed: {}", self.remote_id, e);
                }
            }
            _ => {}
        }

        match self.pc.signaling_state() {
            SignalingState::Stable if self.negotiated => self.set_state(LinkState::Stable),
            SignalingState::Stable => self.set_state(LinkState::New),
            SignalingState::Closed => self.set_state(LinkState::Closed),
            _ => {}
        }
    }
}
