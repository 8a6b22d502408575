mod memory_store;
mod participant;

pub use memory_store::MemoryStore;
pub use participant::{ConnectionId, Participant};

use crate::error::StoreError;
use async_trait::async_trait;
use meshcall_core::{ChatEntry, PeerId, RoomId};

/// Authoritative room state: participants, raised hands and the chat backlog.
///
/// Hub instances that share a store observe the same rooms. Every removal is
/// idempotent: removing something that is already gone is not an error.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn participants(&self, room: &RoomId) -> Result<Vec<Participant>, StoreError>;

    async fn participant(
        &self,
        room: &RoomId,
        peer_id: &PeerId,
    ) -> Result<Option<Participant>, StoreError>;

    /// Inserts or replaces the record keyed by `participant.peer_id`.
    async fn upsert_participant(
        &self,
        room: &RoomId,
        participant: Participant,
    ) -> Result<(), StoreError>;

    async fn remove_participant(
        &self,
        room: &RoomId,
        peer_id: &PeerId,
    ) -> Result<Option<Participant>, StoreError>;

    async fn set_hand_raised(
        &self,
        room: &RoomId,
        peer_id: &PeerId,
        raised: bool,
    ) -> Result<(), StoreError>;

    async fn raised_hands(&self, room: &RoomId) -> Result<Vec<PeerId>, StoreError>;

    /// Appends to the chat log, dropping the oldest entries beyond `limit`.
    async fn push_chat(
        &self,
        room: &RoomId,
        entry: ChatEntry,
        limit: usize,
    ) -> Result<(), StoreError>;

    async fn chat_log(&self, room: &RoomId) -> Result<Vec<ChatEntry>, StoreError>;
}
