use crate::backend::{MediaDevices, PeerConnectionFactory};
use crate::config::ClientConfig;
use crate::engine::{CallEvent, SessionManager};
use crate::error::TransportError;
use crate::media::{MediaController, SharedLocalMedia};
use crate::transport::{SignalingTransport, TransportEvent, WsTransport};
use meshcall_core::{ClientMessage, Identity, PeerId};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

/// One participant's side of a call: signaling, peer links and local media.
pub struct CallClient {
    config: ClientConfig,
    transport: Arc<dyn SignalingTransport>,
    sessions: Arc<SessionManager>,
    media: Arc<MediaController>,
    driver: JoinHandle<()>,
}

impl CallClient {
    /// Connects to the hub in `config` over a WebSocket.
    pub fn connect(
        config: ClientConfig,
        factory: Arc<dyn PeerConnectionFactory>,
        devices: Arc<dyn MediaDevices>,
    ) -> Self {
        let (transport, transport_events) =
            WsTransport::connect(config.signaling_url.clone(), config.backoff.clone());
        Self::with_transport(config, transport, transport_events, factory, devices)
    }

    /// Runs over any signaling transport. Every
    /// [`TransportEvent::Connected`] rejoins the room from scratch.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn SignalingTransport>,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        factory: Arc<dyn PeerConnectionFactory>,
        devices: Arc<dyn MediaDevices>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let local_media = SharedLocalMedia::default();

        let sessions = Arc::new(SessionManager::new(
            config.peer_id.clone(),
            factory,
            transport.clone(),
            local_media.clone(),
            events,
        ));
        let media = MediaController::new(
            devices,
            sessions.clone(),
            transport.clone(),
            local_media.clone(),
        );

        let driver = tokio::spawn(drive(
            config.clone(),
            transport_events,
            transport.clone(),
            sessions.clone(),
            local_media,
        ));

        Self {
            config,
            transport,
            sessions,
            media,
            driver,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.config.peer_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.sessions.subscribe()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn media(&self) -> &MediaController {
        &self.media
    }

    pub async fn raise_hand(&self, raised: bool) -> Result<(), TransportError> {
        self.transport.send(ClientMessage::RaiseHand { raised }).await
    }

    pub async fn send_chat(&self, message: impl Into<String>) -> Result<(), TransportError> {
        self.transport
            .send(ClientMessage::Chat {
                message: message.into(),
            })
            .await
    }

    pub async fn set_speaking(&self, speaking: bool) -> Result<(), TransportError> {
        self.transport.send(ClientMessage::Speaking { speaking }).await
    }

    /// The answer arrives as [`CallEvent::Participants`].
    pub async fn request_participants(&self) -> Result<(), TransportError> {
        self.transport.send(ClientMessage::RequestParticipants).await
    }

    /// Leaves the room for good: no reconnects, no links, no capture.
    pub async fn leave(&self) {
        info!("Leaving room {}", self.config.room_id);
        if let Err(e) = self.transport.send(ClientMessage::Leave).await {
            debug!("Leave not delivered: {}", e);
        }
        self.transport.shutdown().await;
        self.driver.abort();
        self.sessions.reset().await;
        self.media.release_all().await;
    }
}

impl Drop for CallClient {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(
    config: ClientConfig,
    mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    transport: Arc<dyn SignalingTransport>,
    sessions: Arc<SessionManager>,
    local_media: SharedLocalMedia,
) {
    while let Some(event) = transport_events.recv().await {
        match event {
            TransportEvent::Connected => {
                // Links from a previous connection are stale.
                sessions.reset().await;

                let identity = Identity {
                    peer_id: config.peer_id.clone(),
                    user_id: config.user_id.clone(),
                    display_name: config.display_name.clone(),
                    media_state: Some(local_media.lock().media_state()),
                };
                info!("Joining room {} as {}", config.room_id, identity.peer_id);
                let join = ClientMessage::join(config.room_id.clone(), &identity);
                if let Err(e) = transport.send(join).await {
                    warn!("Join not sent: {}", e);
                }
                sessions.emit(CallEvent::SignalingConnected);
            }
            TransportEvent::Message(msg) => sessions.handle_signal(msg).await,
            TransportEvent::Disconnected => {
                warn!("Lost connection to signaling hub");
                sessions.reset().await;
                sessions.emit(CallEvent::SignalingDisconnected);
            }
        }
    }
    debug!("Signaling event stream ended");
}
