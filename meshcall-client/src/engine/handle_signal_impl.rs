use crate::engine::peer_link::LinkCommand;
use crate::engine::{CallEvent, SessionManager};
use meshcall_core::ServerMessage;
use tracing::{debug, info, warn};

impl SessionManager {
    /// Applies one message from the hub.
    pub async fn handle_signal(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::IceConfig { ice_servers } => {
                info!("Received ICE config: {} server(s)", ice_servers.len());
                self.set_ice_servers(ice_servers);
            }

            ServerMessage::Peers {
                peers,
                raised_hands,
                chat,
            } => {
                info!("Joined room with {} other participant(s)", peers.len());
                for peer in &peers {
                    if peer.peer_id != self.local_id && !self.has_live_link(&peer.peer_id) {
                        self.open_link(peer.peer_id.clone()).await;
                    }
                }
                self.emit(CallEvent::Joined {
                    peers,
                    raised_hands,
                    chat,
                });
            }

            ServerMessage::PeerJoined { participant } => {
                info!("{} joined", participant.peer_id);
                if participant.peer_id != self.local_id {
                    // A known id rejoining means its old session is gone.
                    self.open_link(participant.peer_id.clone()).await;
                }
                self.emit(CallEvent::ParticipantJoined(participant));
            }

            ServerMessage::PeerLeft { peer_id } => {
                info!("{} left", peer_id);
                self.close_link(&peer_id).await;
                self.emit(CallEvent::ParticipantLeft(peer_id));
            }

            ServerMessage::PeerUnavailable { peer_id } => {
                warn!("{} is no longer reachable", peer_id);
                self.close_link(&peer_id).await;
            }

            ServerMessage::Offer { from, data } => {
                if !self.has_live_link(&from) {
                    self.open_link(from.clone()).await;
                }
                if !self.forward(&from, LinkCommand::RemoteOffer(data)) {
                    warn!("Dropping offer from {}: no link", from);
                }
            }

            ServerMessage::Answer { from, data } => {
                if !self.forward(&from, LinkCommand::RemoteAnswer(data)) {
                    debug!("Dropping answer from {}: no link", from);
                }
            }

            ServerMessage::Candidate { from, data } => {
                if !self.forward(&from, LinkCommand::RemoteCandidate(data)) {
                    debug!("Dropping candidate from {}: no link", from);
                }
            }

            ServerMessage::NegotiationFailed { from } => {
                if !self.forward(&from, LinkCommand::RemoteRejected) {
                    debug!("Dropping negotiation failure from {}: no link", from);
                }
            }

            ServerMessage::ScreenStart { from, data } => {
                let track_id = data.and_then(|info| info.track_id);
                info!("{} started sharing their screen", from);
                self.forward(&from, LinkCommand::ScreenStarted(track_id.clone()));
                self.emit(CallEvent::ScreenShareStarted {
                    peer_id: from,
                    track_id,
                });
            }

            ServerMessage::ScreenStop { from, .. } => {
                info!("{} stopped sharing their screen", from);
                self.forward(&from, LinkCommand::ScreenStopped);
                self.emit(CallEvent::ScreenShareStopped { peer_id: from });
            }

            ServerMessage::MediaToggled {
                peer_id,
                kind,
                enabled,
            } => self.emit(CallEvent::RemoteMediaToggled {
                peer_id,
                kind,
                enabled,
            }),

            ServerMessage::HandRaised { peer_id, raised } => {
                self.emit(CallEvent::HandRaised { peer_id, raised })
            }

            ServerMessage::Chat { entry } => self.emit(CallEvent::ChatMessage(entry)),

            ServerMessage::Speaking { peer_id, speaking } => {
                self.emit(CallEvent::Speaking { peer_id, speaking })
            }

            ServerMessage::Participants { participants } => {
                self.emit(CallEvent::Participants(participants))
            }

            ServerMessage::JoinTimeout => {
                warn!("Hub reports that this connection never joined");
                self.emit(CallEvent::JoinTimeout);
            }
        }
    }
}
