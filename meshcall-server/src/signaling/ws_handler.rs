use crate::hub::SignalingHub;
use crate::store::ConnectionId;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use meshcall_core::{ClientMessage, Identity, PeerId, RoomId, ServerMessage};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at, sleep, timeout};
use tracing::{debug, info, warn};

const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);
/// Floor for the ping period; `interval_at` rejects a zero period.
const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(10);

pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<SignalingHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Which room and peer a connection speaks for, once it has joined.
#[derive(Debug, Clone)]
struct Binding {
    room_id: RoomId,
    peer_id: PeerId,
}

struct ConnectionSession {
    hub: SignalingHub,
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
    binding: Option<Binding>,
}

async fn handle_socket(socket: WebSocket, hub: SignalingHub) {
    let connection = ConnectionId::new();
    info!("New WebSocket connection: {}", connection);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    hub.service().add_connection(connection, tx.clone());
    hub.service().send_signal(
        connection,
        &ServerMessage::IceConfig {
            ice_servers: hub.service().get_ice_servers(),
        },
    );

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sender.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    let mut session = ConnectionSession {
        hub: hub.clone(),
        connection,
        tx,
        binding: None,
    };

    let send_finished = tokio::select! {
        _ = &mut send_task => true,
        _ = session.run(&mut receiver) => false,
    };

    session.finish().await;
    hub.service().remove_connection(&connection);
    drop(session);

    // Let a queued close frame go out before the socket is dropped.
    if !send_finished && timeout(CLOSE_FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
    info!("WebSocket disconnected: {}", connection);
}

impl ConnectionSession {
    async fn run(&mut self, receiver: &mut SplitStream<WebSocket>) {
        let config = self.hub.config().clone();
        let period = config.heartbeat_interval.max(MIN_HEARTBEAT_INTERVAL);
        let mut heartbeat = interval_at(Instant::now() + period, period);
        let mut alive = true;

        let join_deadline = sleep(config.join_timeout);
        tokio::pin!(join_deadline);
        let mut join_notice_pending = true;

        loop {
            tokio::select! {
                frame = receiver.next() => {
                    let Some(Ok(msg)) = frame else { break };
                    alive = true;
                    match msg {
                        Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => self.handle_message(msg).await,
                            Err(e) => warn!("Invalid message from {}: {}", self.connection, e),
                        },
                        Message::Binary(_) => {
                            warn!("Dropping binary frame from {}", self.connection);
                        }
                        Message::Close(_) => break,
                        Message::Ping(_) | Message::Pong(_) => {}
                    }
                }

                _ = heartbeat.tick() => {
                    if !alive {
                        warn!("Connection {} missed a heartbeat, closing", self.connection);
                        let _ = self.tx.send(Message::Close(None));
                        break;
                    }
                    alive = false;
                    if self.tx.send(Message::Ping(Default::default())).is_err() {
                        break;
                    }
                    if let Some(binding) = &self.binding {
                        let _ = self
                            .hub
                            .heartbeat(&binding.room_id, binding.peer_id.clone(), self.connection)
                            .await;
                    }
                }

                _ = &mut join_deadline, if join_notice_pending => {
                    join_notice_pending = false;
                    if self.binding.is_none() {
                        info!("Connection {} has not joined a room in time", self.connection);
                        self.hub
                            .service()
                            .send_signal(self.connection, &ServerMessage::JoinTimeout);
                    }
                }
            }
        }
    }

    async fn handle_message(&mut self, msg: ClientMessage) {
        debug!("{} from {}", msg.kind(), self.connection);

        match msg {
            ClientMessage::Join {
                room_id,
                peer_id,
                user_id,
                display_name,
                media_state,
            } => {
                let identity = Identity {
                    peer_id,
                    user_id,
                    display_name,
                    media_state,
                };
                self.join(room_id, identity).await;
            }
            other => self.handle_bound_message(other).await,
        }
    }

    /// A re-join under another room or peer id leaves the previous one first.
    async fn join(&mut self, room_id: RoomId, identity: Identity) {
        if let Some(old) = self.binding.take() {
            if old.room_id != room_id || old.peer_id != identity.peer_id {
                let _ = self
                    .hub
                    .leave(&old.room_id, old.peer_id, self.connection)
                    .await;
            }
        }

        let peer_id = identity.peer_id.clone();
        match self
            .hub
            .join(room_id.clone(), identity, self.connection)
            .await
        {
            Ok(_) => self.binding = Some(Binding { room_id, peer_id }),
            Err(e) => warn!("Join from {} rejected: {}", self.connection, e),
        }
    }

    async fn handle_bound_message(&mut self, msg: ClientMessage) {
        let Some(binding) = self.binding.clone() else {
            warn!(
                "Dropping {} from {}: connection has not joined a room",
                msg.kind(),
                self.connection
            );
            return;
        };
        let Binding { room_id, peer_id } = binding;
        let connection = self.connection;
        let hub = &self.hub;

        let result = match msg {
            ClientMessage::Join { .. } => Ok(()),
            ClientMessage::Leave => {
                self.binding = None;
                hub.leave(&room_id, peer_id, connection).await
            }
            ClientMessage::Offer { to, data } => {
                let message = ServerMessage::Offer {
                    from: peer_id.clone(),
                    data,
                };
                hub.relay(&room_id, peer_id, connection, to, message).await
            }
            ClientMessage::Answer { to, data } => {
                let message = ServerMessage::Answer {
                    from: peer_id.clone(),
                    data,
                };
                hub.relay(&room_id, peer_id, connection, to, message).await
            }
            ClientMessage::Candidate { to, data } => {
                let message = ServerMessage::Candidate {
                    from: peer_id.clone(),
                    data,
                };
                hub.relay(&room_id, peer_id, connection, to, message).await
            }
            ClientMessage::NegotiationFailed { to } => {
                let message = ServerMessage::NegotiationFailed {
                    from: peer_id.clone(),
                };
                hub.relay(&room_id, peer_id, connection, to, message).await
            }
            ClientMessage::ScreenStart { to, data } => {
                let message = ServerMessage::ScreenStart {
                    from: peer_id.clone(),
                    data,
                };
                hub.relay(&room_id, peer_id, connection, to, message).await
            }
            ClientMessage::ScreenStop { to, data } => {
                let message = ServerMessage::ScreenStop {
                    from: peer_id.clone(),
                    data,
                };
                hub.relay(&room_id, peer_id, connection, to, message).await
            }
            ClientMessage::ToggleMedia { kind, enabled } => {
                hub.toggle_media(&room_id, peer_id, connection, kind, enabled)
                    .await
            }
            ClientMessage::RaiseHand { raised } => {
                hub.raise_hand(&room_id, peer_id, connection, raised).await
            }
            ClientMessage::Chat { message } => {
                hub.chat(&room_id, peer_id, connection, message).await
            }
            ClientMessage::Speaking { speaking } => {
                hub.speaking(&room_id, peer_id, connection, speaking).await
            }
            ClientMessage::RequestParticipants => {
                match hub.list_participants(&room_id, peer_id, connection).await {
                    Ok(participants) => {
                        hub.service()
                            .send_signal(connection, &ServerMessage::Participants { participants });
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        };

        if let Err(e) = result {
            warn!("Dropping message from {}: {}", connection, e);
        }
    }

    /// Socket is gone: the room keeps the record for its grace period.
    async fn finish(&mut self) {
        if let Some(Binding { room_id, peer_id }) = self.binding.take() {
            let _ = self
                .hub
                .disconnect(&room_id, peer_id, self.connection)
                .await;
        }
    }
}
