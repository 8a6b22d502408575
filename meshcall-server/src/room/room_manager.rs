use crate::config::HubConfig;
use crate::error::HubError;
use crate::room::{Room, RoomCommand};
use crate::signaling::SignalingOutput;
use crate::store::RoomStore;
use dashmap::DashMap;
use meshcall_core::RoomId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Command channels of the live room actors, shared with the actors so an
/// empty room can take itself out.
pub type RoomRegistry = Arc<DashMap<RoomId, mpsc::UnboundedSender<RoomCommand>>>;

/// Registry of the room actors running on this hub instance.
#[derive(Clone)]
pub struct RoomManager {
    rooms: RoomRegistry,
    config: Arc<HubConfig>,
    store: Arc<dyn RoomStore>,
    signaling: Arc<dyn SignalingOutput>,
}

impl RoomManager {
    pub fn new(
        config: Arc<HubConfig>,
        store: Arc<dyn RoomStore>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> Self {
        Self {
            rooms: RoomRegistry::default(),
            config,
            store,
            signaling,
        }
    }

    /// Queues `cmd` on the room's actor, starting one if the room has none.
    ///
    /// The send happens while the registry entry is locked, which is what
    /// lets [`Room`] retire without dropping a command.
    pub fn dispatch(&self, room_id: &RoomId, cmd: RoomCommand) -> Result<(), HubError> {
        let entry = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room_id);
            let (tx, rx) = mpsc::unbounded_channel();
            let room = Room::new(
                room_id.clone(),
                self.config.clone(),
                self.store.clone(),
                self.signaling.clone(),
                rx,
                tx.downgrade(),
                self.rooms.clone(),
            );
            tokio::spawn(room.run());
            tx
        });

        entry
            .send(cmd)
            .map_err(|_| HubError::RoomUnavailable(room_id.to_string()))
    }

    /// Rooms with a running actor on this instance.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
