use crate::backend::{
    ConnectionState, EncodingParameters, LocalTrack, PeerConnection, PeerConnectionEvent,
    PeerConnectionFactory, RemoteTrack, RemoteTrackRef, SignalingState, TransceiverId,
};
use crate::error::SessionError;
use async_trait::async_trait;
use dashmap::DashMap;
use meshcall_core::{IceCandidate, IceServerConfig, PeerId, SdpType, SessionDescription, TrackKind};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

type SampleTracks = Arc<DashMap<String, (LocalTrack, Arc<TrackLocalStaticSample>)>>;
type RemoteTracks = Arc<DashMap<String, Arc<TrackRemote>>>;

/// Peer connections on the native `webrtc` stack.
///
/// Outbound media goes through one [`TrackLocalStaticSample`] per captured
/// track, shared by every connection the track is attached to; the capture
/// pipeline writes encoded samples into [`WebrtcFactory::sample_track`].
/// Inbound RTP is read from [`WebrtcFactory::remote_track`].
pub struct WebrtcFactory {
    api: API,
    samples: SampleTracks,
    remotes: RemoteTracks,
}

impl WebrtcFactory {
    pub fn new() -> Result<Self, SessionError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self {
            api,
            samples: SampleTracks::default(),
            remotes: RemoteTracks::default(),
        })
    }

    /// Where encoded samples for `track` are written.
    pub fn sample_track(&self, track: &LocalTrack) -> Arc<TrackLocalStaticSample> {
        sample_track(&self.samples, track)
    }

    /// An inbound track by the id reported in [`PeerConnectionEvent::Track`].
    pub fn remote_track(&self, id: &str) -> Option<Arc<TrackRemote>> {
        self.remotes.get(id).map(|entry| entry.value().clone())
    }

    /// Same as [`PeerConnectionFactory::create`], keeping the concrete type.
    pub async fn connect(
        &self,
        remote: &PeerId,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<PeerConnectionEvent>,
    ) -> Result<Arc<WebrtcPeerConnection>, SessionError> {
        let configuration = RTCConfiguration {
            ice_servers: ice_servers.iter().map(rtc_ice_server).collect(),
            ..Default::default()
        };
        let pc = Arc::new(self.api.new_peer_connection(configuration).await?);

        let connection = Arc::new(WebrtcPeerConnection {
            remote: remote.clone(),
            pc,
            samples: self.samples.clone(),
            remotes: self.remotes.clone(),
            received: Arc::new(Mutex::new(Vec::new())),
            encodings: Mutex::new(Vec::new()),
        });
        connection.install_handlers(events);

        info!(
            "Created peer connection to {} with {} ICE server(s)",
            remote,
            ice_servers.len()
        );
        Ok(connection)
    }
}

#[async_trait]
impl PeerConnectionFactory for WebrtcFactory {
    async fn create(
        &self,
        remote: &PeerId,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<PeerConnectionEvent>,
    ) -> Result<Arc<dyn PeerConnection>, SessionError> {
        let connection = self.connect(remote, ice_servers, events).await?;
        Ok(connection)
    }
}

/// An inbound track seen on one connection.
#[derive(Clone)]
struct ReceivedTrack {
    id: String,
    kind: TrackKind,
    stream_id: String,
}

pub struct WebrtcPeerConnection {
    remote: PeerId,
    pc: Arc<RTCPeerConnection>,
    samples: SampleTracks,
    remotes: RemoteTracks,
    received: Arc<Mutex<Vec<ReceivedTrack>>>,
    encodings: Mutex<Vec<Option<EncodingParameters>>>,
}

impl WebrtcPeerConnection {
    pub async fn transceiver_count(&self) -> usize {
        self.pc.get_transceivers().await.len()
    }

    /// Limits last set for a transceiver. The stack negotiates bitrate on its
    /// own, so these are kept for the capture pipeline to apply.
    pub async fn encoding_parameters(&self, transceiver: TransceiverId) -> Option<EncodingParameters> {
        self.encodings
            .lock()
            .await
            .get(transceiver.0)
            .copied()
            .flatten()
    }

    fn install_handlers(&self, events: mpsc::UnboundedSender<PeerConnectionEvent>) {
        let tx = events.clone();
        self.pc
            .on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                let tx = tx.clone();
                Box::pin(async move {
                    let Some(candidate) = candidate else { return };
                    match candidate.to_json() {
                        Ok(init) => {
                            let _ = tx.send(PeerConnectionEvent::IceCandidate(from_rtc_candidate(init)));
                        }
                        Err(e) => debug!("Skipping local candidate: {}", e),
                    }
                })
            }));

        let tx = events.clone();
        self.pc.on_negotiation_needed(Box::new(move || {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(PeerConnectionEvent::NegotiationNeeded);
            })
        }));

        let tx = events.clone();
        let remote = self.remote.clone();
        self.pc
            .on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
                let tx = tx.clone();
                let remote = remote.clone();
                Box::pin(async move {
                    debug!("Peer connection to {} is {}", remote, state);
                    if let Some(state) = connection_state(state) {
                        let _ = tx.send(PeerConnectionEvent::ConnectionState(state));
                    }
                })
            }));

        // Weak: the handler is owned by the connection it inspects.
        let pc = Arc::downgrade(&self.pc);
        let received = self.received.clone();
        let remotes = self.remotes.clone();
        let tx = events;
        self.pc
            .on_track(Box::new(move |track: Arc<TrackRemote>, _receiver, transceiver| {
                let tx = tx.clone();
                let pc = pc.clone();
                let received = received.clone();
                let remotes = remotes.clone();
                Box::pin(async move {
                    let Some(pc) = pc.upgrade() else { return };
                    let index = pc
                        .get_transceivers()
                        .await
                        .iter()
                        .position(|t| Arc::ptr_eq(t, &transceiver));

                    let remote = describe_remote_track(&track, &received).await;
                    remotes.insert(remote.id.clone(), track);
                    let _ = tx.send(PeerConnectionEvent::Track {
                        transceiver: index.map(TransceiverId),
                        track: remote,
                    });
                })
            }));
    }

    /// The stack rolls back a description of the same shape as the one in
    /// flight, so the pending SDP is reused with the rollback type.
    async fn rollback_description(&self) -> Result<RTCSessionDescription, SessionError> {
        let pending = match self.pc.pending_local_description().await {
            Some(desc) => desc,
            None => self.pc.pending_remote_description().await.ok_or_else(|| {
                SessionError::InvalidState {
                    operation: "rollback",
                    state: self.signaling_state().to_string(),
                }
            })?,
        };

        let mut rollback = RTCSessionDescription::default();
        rollback.sdp_type = RTCSdpType::Rollback;
        rollback.sdp = pending.sdp;
        Ok(rollback)
    }
}

#[async_trait]
impl PeerConnection for WebrtcPeerConnection {
    async fn add_transceiver(&self, kind: TrackKind) -> Result<TransceiverId, SessionError> {
        let init = RTCRtpTransceiverInit {
            direction: RTCRtpTransceiverDirection::Sendrecv,
            send_encodings: vec![],
        };
        self.pc
            .add_transceiver_from_kind(codec_type(kind), Some(init))
            .await?;

        let mut encodings = self.encodings.lock().await;
        encodings.push(None);
        Ok(TransceiverId(self.pc.get_transceivers().await.len() - 1))
    }

    async fn create_offer(&self) -> Result<SessionDescription, SessionError> {
        let offer = self.pc.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, SessionError> {
        let answer = self.pc.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), SessionError> {
        let desc = match desc.kind {
            SdpType::Rollback => self.rollback_description().await?,
            _ => to_rtc_description(desc)?,
        };
        self.pc.set_local_description(desc).await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), SessionError> {
        if desc.kind == SdpType::Rollback {
            return Err(SessionError::InvalidState {
                operation: "setRemoteDescription(rollback)",
                state: self.signaling_state().to_string(),
            });
        }
        self.pc
            .set_remote_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SessionError> {
        self.pc
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_m_line_index,
                username_fragment: candidate.username_fragment,
            })
            .await?;
        Ok(())
    }

    async fn replace_track(
        &self,
        transceiver: TransceiverId,
        track: Option<LocalTrack>,
    ) -> Result<(), SessionError> {
        let transceivers = self.pc.get_transceivers().await;
        let target = transceivers
            .get(transceiver.0)
            .ok_or_else(|| SessionError::Backend(format!("no transceiver {}", transceiver.0)))?;

        let outbound = track.map(|track| {
            sample_track(&self.samples, &track) as Arc<dyn TrackLocal + Send + Sync>
        });
        target.sender().await.replace_track(outbound).await?;
        Ok(())
    }

    async fn set_encoding_parameters(
        &self,
        transceiver: TransceiverId,
        params: EncodingParameters,
    ) -> Result<(), SessionError> {
        let mut encodings = self.encodings.lock().await;
        match encodings.get_mut(transceiver.0) {
            Some(encoding) => {
                debug!(
                    "Encoding for {} transceiver {}: {} bps, scale {}",
                    self.remote, transceiver.0, params.max_bitrate_bps, params.scale_resolution_down_by
                );
                *encoding = Some(params);
                Ok(())
            }
            None => Err(SessionError::Backend(format!("no transceiver {}", transceiver.0))),
        }
    }

    fn signaling_state(&self) -> SignalingState {
        match self.pc.signaling_state() {
            RTCSignalingState::Unspecified | RTCSignalingState::Stable => SignalingState::Stable,
            RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
            RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
            RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
            RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
            RTCSignalingState::Closed => SignalingState::Closed,
        }
    }

    async fn close(&self) {
        if let Err(e) = self.pc.close().await {
            debug!("Closing peer connection to {}: {}", self.remote, e);
        }
        for track in self.received.lock().await.drain(..) {
            self.remotes.remove(&track.id);
        }
    }
}

fn sample_track(samples: &SampleTracks, track: &LocalTrack) -> Arc<TrackLocalStaticSample> {
    samples.retain(|_, (local, _)| !local.is_stopped());
    samples
        .entry(track.id().to_owned())
        .or_insert_with(|| {
            let sample = TrackLocalStaticSample::new(
                codec_capability(track.kind()),
                track.id().to_owned(),
                track.id().to_owned(),
            );
            (track.clone(), Arc::new(sample))
        })
        .1
        .clone()
}

async fn describe_remote_track(
    track: &TrackRemote,
    received: &Mutex<Vec<ReceivedTrack>>,
) -> RemoteTrack {
    let current = ReceivedTrack {
        id: track.id(),
        kind: track_kind(track.kind()),
        stream_id: track.stream_id(),
    };

    let mut received = received.lock().await;
    let stream_peers = received
        .iter()
        .filter(|t| t.stream_id == current.stream_id && t.id != current.id)
        .map(|t| RemoteTrackRef {
            id: t.id.clone(),
            kind: t.kind,
        })
        .collect();
    received.retain(|t| t.id != current.id);
    received.push(current.clone());

    RemoteTrack {
        id: current.id,
        kind: current.kind,
        label: String::new(),
        stream_peers,
    }
}

fn codec_type(kind: TrackKind) -> RTPCodecType {
    match kind {
        TrackKind::Audio => RTPCodecType::Audio,
        TrackKind::Video => RTPCodecType::Video,
    }
}

fn track_kind(kind: RTPCodecType) -> TrackKind {
    match kind {
        RTPCodecType::Audio => TrackKind::Audio,
        _ => TrackKind::Video,
    }
}

fn codec_capability(kind: TrackKind) -> RTCRtpCodecCapability {
    match kind {
        TrackKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            sdp_fmtp_line: "minptime=10;useinbandfec=1".to_owned(),
            rtcp_feedback: vec![],
        },
        TrackKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            channels: 0,
            sdp_fmtp_line: String::new(),
            rtcp_feedback: vec![],
        },
    }
}

fn rtc_ice_server(server: &IceServerConfig) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
        ..Default::default()
    }
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, SessionError> {
    let rtc = match desc.kind {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpType::Rollback => {
            return Err(SessionError::Backend("rollback carries no description".into()));
        }
    };
    Ok(rtc)
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn connection_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
        RTCPeerConnectionState::Unspecified => None,
    }
}
