use crate::backend::SignalingState;
use crate::engine::LinkState;
use crate::engine::peer_link::PeerLink;
use crate::error::SessionError;
use meshcall_core::{ClientMessage, SdpType, SessionDescription};
use tracing::{debug, info, warn};

impl PeerLink {
    pub(super) async fn handle_remote_offer(&mut self, offer: SessionDescription) {
        if offer.kind != SdpType::Offer {
            warn!("Dropping {:?} sent as offer by {}", offer.kind, self.remote_id);
            return;
        }

        let collision =
            self.making_offer || self.pc.signaling_state() != SignalingState::Stable;
        self.ignore_offer = !self.is_polite() && collision;
        if self.ignore_offer {
            info!("Glare with {}: keeping our offer", self.remote_id);
            return;
        }

        if let Err(e) = self.accept_offer(offer, collision).await {
            warn!("Failed to answer offer from {}: {}", self.remote_id, e);
            self.abort_attempt().await;
            let notice = ClientMessage::NegotiationFailed {
                to: Some(self.remote_id.clone()),
            };
            if let Err(e) = self.send(notice).await {
                debug!("Could not report failed offer to {}: {}", self.remote_id, e);
            }
        }
    }

    /// The remote gave up on our offer; drop it so either side can offer again.
    pub(super) async fn handle_remote_rejected(&mut self) {
        let state = self.pc.signaling_state();
        if state != SignalingState::HaveLocalOffer || self.making_offer {
            debug!(
                "Ignoring negotiation failure from {} in state {}",
                self.remote_id, state
            );
            return;
        }
        info!("{} rejected our offer, rolling back", self.remote_id);
        self.abort_attempt().await;
    }

    async fn accept_offer(
        &mut self,
        offer: SessionDescription,
        collision: bool,
    ) -> Result<(), SessionError> {
        if collision {
            info!("Glare with {}: rolling back our offer", self.remote_id);
            self.pc
                .set_local_description(SessionDescription::rollback())
                .await?;
        }

        self.pc.set_remote_description(offer).await?;
        self.remote_description_applied().await;

        let answer = self.pc.create_answer().await?;
        self.pc.set_local_description(answer.clone()).await?;
        debug!("Sending answer to {}", self.remote_id);
        self.send(ClientMessage::Answer {
            to: Some(self.remote_id.clone()),
            data: answer,
        })
        .await?;

        self.negotiated = true;
        self.set_state(LinkState::Stable);
        Ok(())
    }

    /// Only an answer to our own outstanding offer is applied.
    pub(super) async fn handle_remote_answer(&mut self, answer: SessionDescription) {
        let state = self.pc.signaling_state();
        if answer.kind != SdpType::Answer || state != SignalingState::HaveLocalOffer {
            debug!(
                "Discarding {:?} from {} in state {}",
                answer.kind, self.remote_id, state
            );
            return;
        }

        match self.pc.set_remote_description(answer).await {
            Ok(()) => {
                self.remote_description_applied().await;
                self.negotiated = true;
                self.set_state(LinkState::Stable);
            }
            Err(e) => {
                warn!("Failed to apply answer from {}: {}", self.remote_id, e);
                self.abort_attempt().await;
            }
        }
    }
}
