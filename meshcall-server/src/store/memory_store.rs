use crate::error::StoreError;
use crate::store::{Participant, RoomStore};
use async_trait::async_trait;
use dashmap::DashMap;
use meshcall_core::{ChatEntry, PeerId, RoomId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct RoomRecord {
    participants: BTreeMap<PeerId, Participant>,
    raised_hands: BTreeSet<PeerId>,
    chat: VecDeque<ChatEntry>,
}

/// Process-local [`RoomStore`]. Clones share the same rooms, so several hub
/// instances in one process can be pointed at one store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rooms: Arc<DashMap<RoomId, RoomRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn drop_if_empty(&self, room: &RoomId) {
        self.rooms.remove_if(room, |_, record| {
            record.participants.is_empty() && record.chat.is_empty()
        });
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn participants(&self, room: &RoomId) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .rooms
            .get(room)
            .map(|record| record.participants.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn participant(
        &self,
        room: &RoomId,
        peer_id: &PeerId,
    ) -> Result<Option<Participant>, StoreError> {
        Ok(self
            .rooms
            .get(room)
            .and_then(|record| record.participants.get(peer_id).cloned()))
    }

    async fn upsert_participant(
        &self,
        room: &RoomId,
        participant: Participant,
    ) -> Result<(), StoreError> {
        self.rooms
            .entry(room.clone())
            .or_default()
            .participants
            .insert(participant.peer_id.clone(), participant);
        Ok(())
    }

    async fn remove_participant(
        &self,
        room: &RoomId,
        peer_id: &PeerId,
    ) -> Result<Option<Participant>, StoreError> {
        let removed = self.rooms.get_mut(room).and_then(|mut record| {
            record.raised_hands.remove(peer_id);
            record.participants.remove(peer_id)
        });
        self.drop_if_empty(room);
        Ok(removed)
    }

    async fn set_hand_raised(
        &self,
        room: &RoomId,
        peer_id: &PeerId,
        raised: bool,
    ) -> Result<(), StoreError> {
        if let Some(mut record) = self.rooms.get_mut(room) {
            if raised {
                record.raised_hands.insert(peer_id.clone());
            } else {
                record.raised_hands.remove(peer_id);
            }
        }
        Ok(())
    }

    async fn raised_hands(&self, room: &RoomId) -> Result<Vec<PeerId>, StoreError> {
        Ok(self
            .rooms
            .get(room)
            .map(|record| record.raised_hands.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn push_chat(
        &self,
        room: &RoomId,
        entry: ChatEntry,
        limit: usize,
    ) -> Result<(), StoreError> {
        let mut record = self.rooms.entry(room.clone()).or_default();
        record.chat.push_back(entry);
        while record.chat.len() > limit {
            record.chat.pop_front();
        }
        Ok(())
    }

    async fn chat_log(&self, room: &RoomId) -> Result<Vec<ChatEntry>, StoreError> {
        Ok(self
            .rooms
            .get(room)
            .map(|record| record.chat.iter().cloned().collect())
            .unwrap_or_default())
    }
}
