use crate::broker::{Delivery, Envelope};
use crate::store::ConnectionId;
use axum::extract::ws::Message;
use dashmap::DashMap;
use meshcall_core::{IceServerConfig, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

struct SignalingInner {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    ice_servers: Vec<IceServerConfig>,
}

/// The WebSocket connections held by this hub instance.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                connections: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn add_connection(&self, connection: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.connections.insert(connection, tx);
    }

    pub fn remove_connection(&self, connection: &ConnectionId) {
        self.inner.connections.remove(connection);
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub fn send_signal(&self, connection: ConnectionId, msg: &ServerMessage) {
        self.send_to(std::slice::from_ref(&connection), msg);
    }

    /// Serializes once and sends to every target held here.
    pub fn send_to(&self, targets: &[ConnectionId], msg: &ServerMessage) {
        let local: Vec<_> = targets
            .iter()
            .filter_map(|c| self.inner.connections.get(c).map(|tx| (*c, tx.clone())))
            .collect();
        if local.is_empty() {
            return;
        }

        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize server message: {}", e);
                return;
            }
        };

        for (connection, tx) in local {
            if tx.send(Message::Text(json.clone().into())).is_err() {
                debug!("Dropped message for closed connection {}", connection);
            }
        }
    }

    /// Queues a close frame and forgets the connection.
    pub fn close(&self, connection: &ConnectionId) {
        if let Some((_, tx)) = self.inner.connections.remove(connection) {
            let _ = tx.send(Message::Close(None));
        }
    }

    pub fn dispatch(&self, envelope: Envelope) {
        match envelope.payload {
            Delivery::Message(msg) => self.send_to(&envelope.targets, &msg),
            Delivery::Close => {
                for connection in &envelope.targets {
                    self.close(connection);
                }
            }
        }
    }
}
