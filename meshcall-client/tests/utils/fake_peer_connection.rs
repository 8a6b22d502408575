use async_trait::async_trait;
use meshcall_client::SessionError;
use meshcall_client::backend::{
    EncodingParameters, LocalTrack, PeerConnection, PeerConnectionEvent, PeerConnectionFactory,
    SignalingState, TransceiverId,
};
use meshcall_core::{IceCandidate, IceServerConfig, PeerId, SdpType, SessionDescription, TrackKind};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

struct FakeState {
    signaling: SignalingState,
    transceivers: Vec<TrackKind>,
    senders: Vec<Option<LocalTrack>>,
    encodings: Vec<Option<EncodingParameters>>,
    has_remote: bool,
    offers_created: usize,
    remote_offers: usize,
    remote_answers: usize,
    rollbacks: usize,
    candidates: Vec<IceCandidate>,
    fail_next_offer: bool,
    fail_next_remote: bool,
    closed: bool,
}

/// An in-memory peer connection with a faithful signaling state machine and
/// no media.
pub struct FakePeerConnection {
    pub remote: PeerId,
    pub ice_servers: Vec<IceServerConfig>,
    state: Mutex<FakeState>,
    events: mpsc::UnboundedSender<PeerConnectionEvent>,
}

fn invalid(operation: &'static str, state: SignalingState) -> SessionError {
    SessionError::InvalidState {
        operation,
        state: state.to_string(),
    }
}

impl FakePeerConnection {
    fn new(
        remote: PeerId,
        ice_servers: Vec<IceServerConfig>,
        events: mpsc::UnboundedSender<PeerConnectionEvent>,
    ) -> Self {
        Self {
            remote,
            ice_servers,
            state: Mutex::new(FakeState {
                signaling: SignalingState::Stable,
                transceivers: Vec::new(),
                senders: Vec::new(),
                encodings: Vec::new(),
                has_remote: false,
                offers_created: 0,
                remote_offers: 0,
                remote_answers: 0,
                rollbacks: 0,
                candidates: Vec::new(),
                fail_next_offer: false,
                fail_next_remote: false,
                closed: false,
            }),
            events,
        }
    }

    /// Feeds an event to the link as if the stack had raised it.
    pub fn emit(&self, event: PeerConnectionEvent) {
        let _ = self.events.send(event);
    }

    pub fn fail_next_offer(&self) {
        self.state.lock().unwrap().fail_next_offer = true;
    }

    pub fn fail_next_remote_description(&self) {
        self.state.lock().unwrap().fail_next_remote = true;
    }

    pub fn transceiver_count(&self) -> usize {
        self.state.lock().unwrap().transceivers.len()
    }

    pub fn transceiver_kinds(&self) -> Vec<TrackKind> {
        self.state.lock().unwrap().transceivers.clone()
    }

    pub fn sender(&self, index: usize) -> Option<LocalTrack> {
        self.state.lock().unwrap().senders.get(index).cloned().flatten()
    }

    pub fn encoding(&self, index: usize) -> Option<EncodingParameters> {
        self.state.lock().unwrap().encodings.get(index).copied().flatten()
    }

    pub fn offers_created(&self) -> usize {
        self.state.lock().unwrap().offers_created
    }

    pub fn remote_offers(&self) -> usize {
        self.state.lock().unwrap().remote_offers
    }

    pub fn remote_answers(&self) -> usize {
        self.state.lock().unwrap().remote_answers
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    pub fn candidates(&self) -> Vec<IceCandidate> {
        self.state.lock().unwrap().candidates.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn local_candidate(&self) -> IceCandidate {
        IceCandidate {
            candidate: format!("candidate:1 1 udp 2122260223 10.0.0.1 5000 typ host for {}", self.remote),
            sdp_mid: Some("0".into()),
            sdp_m_line_index: Some(0),
            username_fragment: None,
        }
    }
}

#[async_trait]
impl PeerConnection for FakePeerConnection {
    async fn add_transceiver(&self, kind: TrackKind) -> Result<TransceiverId, SessionError> {
        let mut state = self.state.lock().unwrap();
        state.transceivers.push(kind);
        state.senders.push(None);
        state.encodings.push(None);
        Ok(TransceiverId(state.transceivers.len() - 1))
    }

    async fn create_offer(&self) -> Result<SessionDescription, SessionError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(invalid("createOffer", SignalingState::Closed));
        }
        if std::mem::take(&mut state.fail_next_offer) {
            return Err(SessionError::Backend("injected offer failure".into()));
        }
        state.offers_created += 1;
        Ok(SessionDescription::offer(format!(
            "v=0 offer#{} m={}",
            state.offers_created,
            state.transceivers.len()
        )))
    }

    async fn create_answer(&self) -> Result<SessionDescription, SessionError> {
        let state = self.state.lock().unwrap();
        if state.signaling != SignalingState::HaveRemoteOffer {
            return Err(invalid("createAnswer", state.signaling));
        }
        Ok(SessionDescription::answer(format!(
            "v=0 answer m={}",
            state.transceivers.len()
        )))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), SessionError> {
        let emit_candidate = {
            let mut state = self.state.lock().unwrap();
            let next = match (desc.kind, state.signaling) {
                (SdpType::Offer, SignalingState::Stable) => SignalingState::HaveLocalOffer,
                (SdpType::Answer, SignalingState::HaveRemoteOffer) => SignalingState::Stable,
                (SdpType::Rollback, SignalingState::HaveLocalOffer)
                | (SdpType::Rollback, SignalingState::HaveRemoteOffer) => {
                    state.rollbacks += 1;
                    SignalingState::Stable
                }
                (_, current) => return Err(invalid("setLocalDescription", current)),
            };
            state.signaling = next;
            desc.kind != SdpType::Rollback
        };

        if emit_candidate {
            self.emit(PeerConnectionEvent::IceCandidate(self.local_candidate()));
        }
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_next_remote) {
            return Err(SessionError::Backend("injected remote description failure".into()));
        }
        let next = match (desc.kind, state.signaling) {
            (SdpType::Offer, SignalingState::Stable) => {
                state.remote_offers += 1;
                SignalingState::HaveRemoteOffer
            }
            (SdpType::Answer, SignalingState::HaveLocalOffer) => {
                state.remote_answers += 1;
                SignalingState::Stable
            }
            (_, current) => return Err(invalid("setRemoteDescription", current)),
        };
        state.signaling = next;
        state.has_remote = true;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if !state.has_remote {
            return Err(invalid("addIceCandidate", state.signaling));
        }
        state.candidates.push(candidate);
        Ok(())
    }

    async fn replace_track(
        &self,
        transceiver: TransceiverId,
        track: Option<LocalTrack>,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        match state.senders.get_mut(transceiver.0) {
            Some(sender) => {
                *sender = track;
                Ok(())
            }
            None => Err(SessionError::Backend(format!("no transceiver {}", transceiver.0))),
        }
    }

    async fn set_encoding_parameters(
        &self,
        transceiver: TransceiverId,
        params: EncodingParameters,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        match state.encodings.get_mut(transceiver.0) {
            Some(encoding) => {
                *encoding = Some(params);
                Ok(())
            }
            None => Err(SessionError::Backend(format!("no transceiver {}", transceiver.0))),
        }
    }

    fn signaling_state(&self) -> SignalingState {
        self.state.lock().unwrap().signaling
    }

    async fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.signaling = SignalingState::Closed;
    }
}

/// Hands out [`FakePeerConnection`]s and remembers every one of them.
#[derive(Default)]
pub struct FakeFactory {
    created: Mutex<Vec<Arc<FakePeerConnection>>>,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connections_to(&self, remote: &str) -> Vec<Arc<FakePeerConnection>> {
        let remote = PeerId::from(remote);
        self.created
            .lock()
            .unwrap()
            .iter()
            .filter(|pc| pc.remote == remote)
            .cloned()
            .collect()
    }

    /// The most recent connection to `remote`.
    pub fn pc_to(&self, remote: &str) -> Arc<FakePeerConnection> {
        self.connections_to(remote)
            .pop()
            .unwrap_or_else(|| panic!("no connection to {remote}"))
    }

    pub fn total(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[async_trait]
impl PeerConnectionFactory for FakeFactory {
    async fn create(
        &self,
        remote: &PeerId,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<PeerConnectionEvent>,
    ) -> Result<Arc<dyn PeerConnection>, SessionError> {
        let pc = Arc::new(FakePeerConnection::new(
            remote.clone(),
            ice_servers.to_vec(),
            events,
        ));
        self.created.lock().unwrap().push(pc.clone());
        Ok(pc)
    }
}
