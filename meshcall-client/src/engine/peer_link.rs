use crate::backend::{
    ConnectionState, EncodingParameters, LocalTrack, PeerConnection, PeerConnectionEvent, PeerConnectionFactory,
    TransceiverId, TransceiverSlot,
};
use crate::engine::{CallEvent, LinkState};
use crate::error::SessionError;
use crate::media::SharedLocalMedia;
use crate::transport::SignalingTransport;
use meshcall_core::{ClientMessage, IceCandidate, IceServerConfig, PeerId, SessionDescription};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub(crate) enum LinkCommand {
    RemoteOffer(SessionDescription),
    RemoteAnswer(SessionDescription),
    RemoteCandidate(IceCandidate),
    /// The remote could not apply our last offer.
    RemoteRejected,
    ScreenStarted(Option<String>),
    ScreenStopped,
    ReplaceTrack {
        slot: TransceiverSlot,
        track: Option<LocalTrack>,
        ack: oneshot::Sender<Result<(), SessionError>>,
    },
    SetScreenEncoding(EncodingParameters),
}

/// What a new link borrows from its manager.
pub(crate) struct LinkContext {
    pub local_id: PeerId,
    pub factory: Arc<dyn PeerConnectionFactory>,
    pub signaling: Arc<dyn SignalingTransport>,
    pub media: SharedLocalMedia,
    pub events: broadcast::Sender<CallEvent>,
    pub ice_servers: Vec<IceServerConfig>,
}

/// The media session with one remote participant.
///
/// Runs as its own task; every negotiation step for the pair happens on
/// that task, so the flags below are never observed mid-update.
pub(crate) struct PeerLink {
    pub(super) local_id: PeerId,
    pub(super) remote_id: PeerId,
    pub(super) pc: Arc<dyn PeerConnection>,
    pub(super) transceivers: [TransceiverId; 3],
    pub(super) signaling: Arc<dyn SignalingTransport>,
    pub(super) events: broadcast::Sender<CallEvent>,
    pub(super) state: Arc<watch::Sender<LinkState>>,
    pub(super) making_offer: bool,
    pub(super) ignore_offer: bool,
    /// At least one offer/answer exchange has completed.
    pub(super) negotiated: bool,
    pub(super) has_remote_description: bool,
    pub(super) pending_candidates: Vec<IceCandidate>,
    pub(super) announced_screens: HashSet<String>,
}

/// The manager's side of a running [`PeerLink`].
pub(crate) struct LinkHandle {
    pub(super) remote_id: PeerId,
    pub(super) pc: Arc<dyn PeerConnection>,
    pub(super) commands: mpsc::UnboundedSender<LinkCommand>,
    pub(super) state: Arc<watch::Sender<LinkState>>,
    pub(super) events: broadcast::Sender<CallEvent>,
    pub(super) task: JoinHandle<()>,
}

pub(super) fn publish_state(
    state: &watch::Sender<LinkState>,
    events: &broadcast::Sender<CallEvent>,
    peer_id: &PeerId,
    next: LinkState,
) {
    let changed = state.send_if_modified(|current| {
        if *current == next || *current == LinkState::Closed {
            return false;
        }
        *current = next;
        true
    });

    if changed {
        debug!("Link to {} is now {:?}", peer_id, next);
        let _ = events.send(CallEvent::LinkStateChanged {
            peer_id: peer_id.clone(),
            state: next,
        });
    }
}

impl LinkHandle {
    pub(crate) fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state() == LinkState::Closed
    }

    /// Queues a command; `false` once the link task has stopped.
    pub(crate) fn send(&self, cmd: LinkCommand) -> bool {
        self.commands.send(cmd).is_ok()
    }

    /// Stops the link wherever it is in its negotiation.
    pub(crate) async fn close(self) {
        self.task.abort();
        self.pc.close().await;
        publish_state(&self.state, &self.events, &self.remote_id, LinkState::Closed);
        info!("Closed link to {}", self.remote_id);
    }
}

impl PeerLink {
    pub(super) fn is_initiator(&self) -> bool {
        self.local_id.is_initiator_towards(&self.remote_id)
    }

    pub(super) fn is_polite(&self) -> bool {
        self.local_id.is_polite_towards(&self.remote_id)
    }

    pub(super) fn link_state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub(super) fn set_state(&self, next: LinkState) {
        publish_state(&self.state, &self.events, &self.remote_id, next);
    }

    pub(super) fn transceiver(&self, slot: TransceiverSlot) -> TransceiverId {
        self.transceivers[slot.index()]
    }

    pub(super) async fn send(&self, msg: ClientMessage) -> Result<(), SessionError> {
        self.signaling.send(msg).await?;
        Ok(())
    }

    pub(super) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<LinkCommand>,
        mut pc_events: mpsc::UnboundedReceiver<PeerConnectionEvent>,
        active_screen: Option<String>,
    ) {
        if let Some(track_id) = active_screen {
            self.announce_screen(track_id).await;
        }
        if self.is_initiator() {
            self.negotiate().await;
        }

        let mut pc_open = true;
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                event = pc_events.recv(), if pc_open => match event {
                    Some(event) => self.handle_pc_event(event).await,
                    None => pc_open = false,
                },
            }

            if self.link_state() == LinkState::Closed {
                break;
            }
        }

        self.pc.close().await;
        self.set_state(LinkState::Closed);
        debug!("Link task for {} stopped", self.remote_id);
    }

    async fn handle_command(&mut self, cmd: LinkCommand) {
        match cmd {
            LinkCommand::RemoteOffer(offer) => self.handle_remote_offer(offer).await,
            LinkCommand::RemoteAnswer(answer) => self.handle_remote_answer(answer).await,
            LinkCommand::RemoteCandidate(candidate) => {
                self.handle_remote_candidate(candidate).await
            }
            LinkCommand::RemoteRejected => self.handle_remote_rejected().await,
            LinkCommand::ScreenStarted(track_id) => self.handle_screen_started(track_id),
            LinkCommand::ScreenStopped => self.announced_screens.clear(),
            LinkCommand::ReplaceTrack { slot, track, ack } => {
                let result = self.pc.replace_track(self.transceiver(slot), track).await;
                let _ = ack.send(result);
            }
            LinkCommand::SetScreenEncoding(params) => {
                let screen = self.transceiver(TransceiverSlot::Screen);
                if let Err(e) = self.pc.set_encoding_parameters(screen, params).await {
                    warn!("Failed to set screen encoding for {}: {}", self.remote_id, e);
                }
            }
        }
    }

    async fn handle_pc_event(&mut self, event: PeerConnectionEvent) {
        match event {
            PeerConnectionEvent::IceCandidate(candidate) => {
                let msg = ClientMessage::Candidate {
                    to: Some(self.remote_id.clone()),
                    data: candidate,
                };
                if let Err(e) = self.send(msg).await {
                    debug!("Dropping local candidate for {}: {}", self.remote_id, e);
                }
            }
            PeerConnectionEvent::Track { transceiver, track } => {
                self.handle_remote_track(transceiver, track)
            }
            PeerConnectionEvent::NegotiationNeeded => self.handle_negotiation_needed().await,
            PeerConnectionEvent::ConnectionState(state) => match state {
                ConnectionState::Failed | ConnectionState::Closed => {
                    warn!("Connection to {} is {:?}", self.remote_id, state);
                    self.set_state(LinkState::Closed);
                }
                ConnectionState::Connected => info!("Media connected with {}", self.remote_id),
                other => debug!("Connection to {} is {:?}", self.remote_id, other),
            },
        }
    }
}
