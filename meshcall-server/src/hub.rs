use crate::broker::{Broker, LocalBroker};
use crate::config::HubConfig;
use crate::error::HubError;
use crate::room::{JoinOutcome, RoomCommand, RoomManager};
use crate::signaling::{BrokerOutput, SignalingService, ws_handler};
use crate::store::{ConnectionId, MemoryStore, RoomStore};
use axum::Router;
use axum::extract::ws::Message;
use axum::http::StatusCode;
use axum::routing::get;
use futures::StreamExt;
use meshcall_core::{Identity, MediaKind, ParticipantInfo, PeerId, RoomId, ServerMessage};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

struct HubInner {
    config: Arc<HubConfig>,
    rooms: RoomManager,
    service: SignalingService,
    fanout: JoinHandle<()>,
}

impl Drop for HubInner {
    fn drop(&mut self) {
        self.fanout.abort();
    }
}

/// One signaling hub instance.
///
/// Instances built with [`SignalingHub::with_backends`] over the same store
/// and broker serve the same logical rooms. Must be created inside a tokio
/// runtime.
#[derive(Clone)]
pub struct SignalingHub {
    inner: Arc<HubInner>,
}

impl SignalingHub {
    /// A standalone hub with in-memory state.
    pub fn new(config: HubConfig) -> Self {
        Self::with_backends(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(LocalBroker::new()),
        )
    }

    pub fn with_backends(
        config: HubConfig,
        store: Arc<dyn RoomStore>,
        broker: Arc<dyn Broker>,
    ) -> Self {
        let config = Arc::new(config);
        let service = SignalingService::new(config.ice_servers.clone());

        // Subscribe before any room can publish.
        let mut envelopes = broker.subscribe();
        let fanout = tokio::spawn({
            let service = service.clone();
            async move {
                while let Some(envelope) = envelopes.next().await {
                    service.dispatch(envelope);
                }
                info!("Broker stream ended, fanout stopped");
            }
        });

        let output = Arc::new(BrokerOutput::new(broker));
        let rooms = RoomManager::new(config.clone(), store, output);

        Self {
            inner: Arc::new(HubInner {
                config,
                rooms,
                service,
                fanout,
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub(crate) fn service(&self) -> &SignalingService {
        &self.inner.service
    }

    pub fn connection_count(&self) -> usize {
        self.inner.service.connection_count()
    }

    /// Rooms with a live actor on this instance. Empty rooms are released.
    pub fn room_count(&self) -> usize {
        self.inner.rooms.room_count()
    }

    /// Registers a connection on this instance and returns the frames the
    /// hub sends to it. The WebSocket route does this for every socket.
    pub fn attach(&self, connection: ConnectionId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.service.add_connection(connection, tx);
        rx
    }

    pub fn detach(&self, connection: &ConnectionId) {
        self.inner.service.remove_connection(connection);
    }

    pub async fn join(
        &self,
        room_id: RoomId,
        identity: Identity,
        connection: ConnectionId,
    ) -> Result<JoinOutcome, HubError> {
        if room_id.is_blank() {
            return Err(HubError::InvalidJoin("roomId must not be empty"));
        }

        let (reply, rx) = oneshot::channel();
        self.dispatch(
            &room_id,
            RoomCommand::Join {
                identity,
                connection,
                reply,
            },
        )
        .await?;
        rx.await
            .map_err(|_| HubError::RoomUnavailable(room_id.to_string()))?
    }

    pub async fn leave(
        &self,
        room_id: &RoomId,
        peer_id: PeerId,
        connection: ConnectionId,
    ) -> Result<(), HubError> {
        self.dispatch(
            room_id,
            RoomCommand::Leave {
                peer_id,
                connection,
            },
        )
        .await
    }

    pub async fn disconnect(
        &self,
        room_id: &RoomId,
        peer_id: PeerId,
        connection: ConnectionId,
    ) -> Result<(), HubError> {
        self.dispatch(
            room_id,
            RoomCommand::Disconnect {
                peer_id,
                connection,
            },
        )
        .await
    }

    /// Routes `message` to `to`, or to the rest of the room when `to` is `None`.
    pub async fn relay(
        &self,
        room_id: &RoomId,
        from: PeerId,
        connection: ConnectionId,
        to: Option<PeerId>,
        message: ServerMessage,
    ) -> Result<(), HubError> {
        self.dispatch(
            room_id,
            RoomCommand::Relay {
                from,
                connection,
                to,
                message,
            },
        )
        .await
    }

    pub async fn toggle_media(
        &self,
        room_id: &RoomId,
        peer_id: PeerId,
        connection: ConnectionId,
        kind: MediaKind,
        enabled: bool,
    ) -> Result<(), HubError> {
        self.dispatch(
            room_id,
            RoomCommand::ToggleMedia {
                peer_id,
                connection,
                kind,
                enabled,
            },
        )
        .await
    }

    pub async fn raise_hand(
        &self,
        room_id: &RoomId,
        peer_id: PeerId,
        connection: ConnectionId,
        raised: bool,
    ) -> Result<(), HubError> {
        self.dispatch(
            room_id,
            RoomCommand::RaiseHand {
                peer_id,
                connection,
                raised,
            },
        )
        .await
    }

    pub async fn chat(
        &self,
        room_id: &RoomId,
        peer_id: PeerId,
        connection: ConnectionId,
        message: String,
    ) -> Result<(), HubError> {
        self.dispatch(
            room_id,
            RoomCommand::Chat {
                peer_id,
                connection,
                message,
            },
        )
        .await
    }

    pub async fn speaking(
        &self,
        room_id: &RoomId,
        peer_id: PeerId,
        connection: ConnectionId,
        speaking: bool,
    ) -> Result<(), HubError> {
        self.dispatch(
            room_id,
            RoomCommand::Speaking {
                peer_id,
                connection,
                speaking,
            },
        )
        .await
    }

    /// Active participants other than the requester.
    pub async fn list_participants(
        &self,
        room_id: &RoomId,
        peer_id: PeerId,
        connection: ConnectionId,
    ) -> Result<Vec<ParticipantInfo>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.dispatch(
            room_id,
            RoomCommand::ListParticipants {
                peer_id,
                connection,
                reply,
            },
        )
        .await?;
        rx.await
            .map_err(|_| HubError::RoomUnavailable(room_id.to_string()))?
    }

    pub async fn heartbeat(
        &self,
        room_id: &RoomId,
        peer_id: PeerId,
        connection: ConnectionId,
    ) -> Result<(), HubError> {
        self.dispatch(
            room_id,
            RoomCommand::Heartbeat {
                peer_id,
                connection,
            },
        )
        .await
    }

    async fn dispatch(&self, room_id: &RoomId, cmd: RoomCommand) -> Result<(), HubError> {
        self.inner.rooms.dispatch(room_id, cmd)
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(health))
            .route(&self.inner.config.signaling_path, get(ws_handler))
            .layer(cors)
            .with_state(self.clone())
    }

    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        self.serve_with_shutdown(listener, std::future::pending())
            .await
    }

    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            info!(
                "Signaling hub listening on ws://{}{}",
                addr, self.inner.config.signaling_path
            );
        }
        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}
