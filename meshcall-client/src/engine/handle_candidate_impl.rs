use crate::engine::peer_link::PeerLink;
use meshcall_core::IceCandidate;
use tracing::{debug, warn};

impl PeerLink {
    /// Candidates that arrive before any remote description are held back.
    pub(super) async fn handle_remote_candidate(&mut self, candidate: IceCandidate) {
        if !self.has_remote_description {
            debug!("Buffering candidate from {}", self.remote_id);
            self.pending_candidates.push(candidate);
            return;
        }
        self.add_candidate(candidate).await;
    }

    pub(super) async fn remote_description_applied(&mut self) {
        self.has_remote_description = true;
        for candidate in std::mem::take(&mut self.pending_candidates) {
            self.add_candidate(candidate).await;
        }
    }

    async fn add_candidate(&self, candidate: IceCandidate) {
        if let Err(e) = self.pc.add_ice_candidate(candidate).await {
            // Candidates of an offer we ignored are expected to fail.
            if !self.ignore_offer {
                warn!("Failed to add candidate from {}: {}", self.remote_id, e);
            }
        }
    }
}
