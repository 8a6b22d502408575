use crate::store::ConnectionId;
use meshcall_core::{RoomId, ServerMessage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Delivery {
    Message(ServerMessage),
    /// Force-close the targeted connections.
    Close,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub room_id: RoomId,
    pub targets: Vec<ConnectionId>,
    pub payload: Delivery,
}

impl Envelope {
    pub fn message(room_id: RoomId, targets: Vec<ConnectionId>, message: ServerMessage) -> Self {
        Self {
            room_id,
            targets,
            payload: Delivery::Message(message),
        }
    }

    pub fn close(room_id: RoomId, connection: ConnectionId) -> Self {
        Self {
            room_id,
            targets: vec![connection],
            payload: Delivery::Close,
        }
    }
}
