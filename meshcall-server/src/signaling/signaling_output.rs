use crate::broker::{Broker, Envelope};
use crate::store::ConnectionId;
use async_trait::async_trait;
use meshcall_core::{RoomId, ServerMessage};
use std::sync::Arc;
use tracing::error;

/// Where a room sends what it has to say to its connections.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Send `message` to each of `targets`. Unknown or closed targets are skipped.
    async fn deliver(&self, room_id: &RoomId, targets: Vec<ConnectionId>, message: ServerMessage);

    /// Force-close a connection, wherever it is held.
    async fn close(&self, room_id: &RoomId, connection: ConnectionId);
}

/// Publishes room output on the broker; every hub instance's fanout task then
/// delivers to the connections it holds.
pub struct BrokerOutput {
    broker: Arc<dyn Broker>,
}

impl BrokerOutput {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl SignalingOutput for BrokerOutput {
    async fn deliver(&self, room_id: &RoomId, targets: Vec<ConnectionId>, message: ServerMessage) {
        if targets.is_empty() {
            return;
        }
        let envelope = Envelope::message(room_id.clone(), targets, message);
        if let Err(e) = self.broker.publish(envelope).await {
            error!("Failed to publish to room {}: {:#}", room_id, e);
        }
    }

    async fn close(&self, room_id: &RoomId, connection: ConnectionId) {
        if let Err(e) = self
            .broker
            .publish(Envelope::close(room_id.clone(), connection))
            .await
        {
            error!("Failed to publish close for {}: {:#}", connection, e);
        }
    }
}
