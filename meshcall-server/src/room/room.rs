use crate::config::HubConfig;
use crate::error::HubError;
use crate::room::room_command::{JoinOutcome, RoomCommand};
use crate::room::room_manager::RoomRegistry;
use crate::signaling::SignalingOutput;
use crate::store::{ConnectionId, Participant, RoomStore};
use meshcall_core::utils::now_millis;
use meshcall_core::{
    ChatEntry, Identity, MediaKind, ParticipantInfo, PeerId, RoomId, ServerMessage,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const DEFAULT_DISPLAY_NAME: &str = "Guest";

/// Single-writer actor for one room on this hub instance.
///
/// State lives in the [`RoomStore`]; the actor only serializes the commands
/// that reach it through this instance.
pub struct Room {
    room_id: RoomId,
    config: Arc<HubConfig>,
    store: Arc<dyn RoomStore>,
    signaling: Arc<dyn SignalingOutput>,
    command_rx: mpsc::UnboundedReceiver<RoomCommand>,
    command_tx: mpsc::WeakUnboundedSender<RoomCommand>,
    registry: RoomRegistry,
    pending_removals: HashMap<PeerId, JoinHandle<()>>,
}

impl Room {
    pub fn new(
        room_id: RoomId,
        config: Arc<HubConfig>,
        store: Arc<dyn RoomStore>,
        signaling: Arc<dyn SignalingOutput>,
        command_rx: mpsc::UnboundedReceiver<RoomCommand>,
        command_tx: mpsc::WeakUnboundedSender<RoomCommand>,
        registry: RoomRegistry,
    ) -> Self {
        Self {
            room_id,
            config,
            store,
            signaling,
            command_rx,
            command_tx,
            registry,
            pending_removals: HashMap::new(),
        }
    }

    pub async fn run(mut self) {
        info!("Room {} event loop started", self.room_id);

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;
            if self.retire_if_idle().await {
                break;
            }
        }

        for (_, timer) in self.pending_removals.drain() {
            timer.abort();
        }
        info!("Room {} event loop finished", self.room_id);
    }

    /// Unregisters the room once nobody is in it and no grace timer is
    /// running. Senders only reach the channel through the registry entry, so
    /// an empty queue checked under the entry lock means no command is lost.
    async fn retire_if_idle(&self) -> bool {
        if !self.pending_removals.is_empty() {
            return false;
        }
        match self.store.participants(&self.room_id).await {
            Ok(participants) if participants.is_empty() => {}
            Ok(_) => return false,
            Err(e) => {
                warn!("Room {}: keeping actor, store unavailable: {}", self.room_id, e);
                return false;
            }
        }

        let Some(own) = self.command_tx.upgrade() else {
            return true;
        };
        let retired = self
            .registry
            .remove_if(&self.room_id, |_, tx| {
                tx.same_channel(&own) && self.command_rx.is_empty()
            })
            .is_some();
        if retired {
            debug!("Room {} is empty, releasing its actor", self.room_id);
        }
        retired
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        let result = match cmd {
            RoomCommand::Join {
                identity,
                connection,
                reply,
            } => {
                let outcome = self.join(identity, connection).await;
                let _ = reply.send(outcome);
                Ok(())
            }

            RoomCommand::Leave {
                peer_id,
                connection,
            } => self.leave(&peer_id, connection).await,

            RoomCommand::Disconnect {
                peer_id,
                connection,
            } => self.disconnect(&peer_id, connection).await,

            RoomCommand::Relay {
                from,
                connection,
                to,
                message,
            } => self.relay(&from, connection, to, message).await,

            RoomCommand::ToggleMedia {
                peer_id,
                connection,
                kind,
                enabled,
            } => self.toggle_media(&peer_id, connection, kind, enabled).await,

            RoomCommand::RaiseHand {
                peer_id,
                connection,
                raised,
            } => self.raise_hand(&peer_id, connection, raised).await,

            RoomCommand::Chat {
                peer_id,
                connection,
                message,
            } => self.chat(&peer_id, connection, message).await,

            RoomCommand::Speaking {
                peer_id,
                connection,
                speaking,
            } => self.speaking(&peer_id, connection, speaking).await,

            RoomCommand::ListParticipants {
                peer_id,
                connection,
                reply,
            } => {
                let listing = self.list_participants(&peer_id, connection).await;
                let _ = reply.send(listing);
                Ok(())
            }

            RoomCommand::Heartbeat {
                peer_id,
                connection,
            } => self.heartbeat(&peer_id, connection).await,

            RoomCommand::GraceExpired {
                peer_id,
                connection,
            } => self.grace_expired(&peer_id, connection).await,
        };

        if let Err(e) = result {
            error!("Room {}: {}", self.room_id, e);
        }
    }

    async fn join(
        &mut self,
        identity: Identity,
        connection: ConnectionId,
    ) -> Result<JoinOutcome, HubError> {
        if identity.peer_id.is_blank() {
            return Err(HubError::InvalidJoin("peerId must not be empty"));
        }

        let existing = self.store.participants(&self.room_id).await?;
        let stale: Vec<&Participant> = existing
            .iter()
            .filter(|p| {
                p.peer_id == identity.peer_id || p.same_user(identity.user_id.as_deref())
            })
            .collect();

        for old in stale {
            self.cancel_removal(&old.peer_id);
            self.store
                .remove_participant(&self.room_id, &old.peer_id)
                .await?;

            if !old.is_active || old.connection == connection {
                continue;
            }

            info!(
                "Retiring connection {} of {} in room {}",
                old.connection, old.peer_id, self.room_id
            );
            self.signaling.close(&self.room_id, old.connection).await;
            let targets = self.active_connections_except(&old.peer_id).await?;
            self.signaling
                .deliver(
                    &self.room_id,
                    targets,
                    ServerMessage::PeerLeft {
                        peer_id: old.peer_id.clone(),
                    },
                )
                .await;
        }

        let display_name = identity
            .display_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_owned());

        let participant = Participant {
            peer_id: identity.peer_id.clone(),
            user_id: identity.user_id,
            display_name,
            media_state: identity.media_state.unwrap_or_default(),
            connection,
            last_seen: now_millis(),
            is_active: true,
        };
        self.store
            .upsert_participant(&self.room_id, participant.clone())
            .await?;

        let others = self.active_others(&participant.peer_id).await?;
        let outcome = JoinOutcome {
            peers: others.iter().map(Participant::info).collect(),
            raised_hands: self.store.raised_hands(&self.room_id).await?,
            chat: self.store.chat_log(&self.room_id).await?,
        };

        self.signaling
            .deliver(
                &self.room_id,
                vec![connection],
                ServerMessage::Peers {
                    peers: outcome.peers.clone(),
                    raised_hands: outcome.raised_hands.clone(),
                    chat: outcome.chat.clone(),
                },
            )
            .await;
        self.signaling
            .deliver(
                &self.room_id,
                others.iter().map(|p| p.connection).collect(),
                ServerMessage::PeerJoined {
                    participant: participant.info(),
                },
            )
            .await;

        info!(
            "{} joined room {} ({} other participants)",
            participant.peer_id,
            self.room_id,
            others.len()
        );
        Ok(outcome)
    }

    async fn leave(&mut self, peer_id: &PeerId, connection: ConnectionId) -> Result<(), HubError> {
        let Some(_) = self.authorized(peer_id, connection).await? else {
            return Ok(());
        };

        self.cancel_removal(peer_id);
        self.store.remove_participant(&self.room_id, peer_id).await?;
        self.broadcast_peer_left(peer_id).await?;

        info!("{} left room {}", peer_id, self.room_id);
        Ok(())
    }

    async fn disconnect(
        &mut self,
        peer_id: &PeerId,
        connection: ConnectionId,
    ) -> Result<(), HubError> {
        let Some(mut participant) = self.authorized(peer_id, connection).await? else {
            debug!("Ignoring stale disconnect of {} ({})", peer_id, connection);
            return Ok(());
        };

        participant.is_active = false;
        participant.last_seen = now_millis();
        self.store
            .upsert_participant(&self.room_id, participant)
            .await?;
        self.store
            .set_hand_raised(&self.room_id, peer_id, false)
            .await?;
        self.broadcast_peer_left(peer_id).await?;
        self.schedule_removal(peer_id.clone(), connection);

        info!(
            "{} disconnected from room {}, record kept for {:?}",
            peer_id, self.room_id, self.config.grace_period
        );
        Ok(())
    }

    async fn relay(
        &mut self,
        from: &PeerId,
        connection: ConnectionId,
        to: Option<PeerId>,
        message: ServerMessage,
    ) -> Result<(), HubError> {
        if self.authorized(from, connection).await?.is_none() {
            warn!("Dropping relay from {} ({}): not an active participant", from, connection);
            return Ok(());
        }

        let Some(target) = to else {
            let targets = self.active_connections_except(from).await?;
            self.signaling.deliver(&self.room_id, targets, message).await;
            return Ok(());
        };

        match self.store.participant(&self.room_id, &target).await? {
            Some(p) if p.is_active => {
                debug!("Relaying {} -> {} in room {}", from, target, self.room_id);
                self.signaling
                    .deliver(&self.room_id, vec![p.connection], message)
                    .await;
            }
            _ => {
                debug!("{} is unavailable, notifying {}", target, from);
                self.signaling
                    .deliver(
                        &self.room_id,
                        vec![connection],
                        ServerMessage::PeerUnavailable { peer_id: target },
                    )
                    .await;
            }
        }
        Ok(())
    }

    async fn toggle_media(
        &mut self,
        peer_id: &PeerId,
        connection: ConnectionId,
        kind: MediaKind,
        enabled: bool,
    ) -> Result<(), HubError> {
        let Some(mut participant) = self.authorized(peer_id, connection).await? else {
            return Ok(());
        };

        participant.media_state.set(kind, enabled);
        participant.last_seen = now_millis();
        self.store
            .upsert_participant(&self.room_id, participant)
            .await?;

        let targets = self.active_connections_except(peer_id).await?;
        self.signaling
            .deliver(
                &self.room_id,
                targets,
                ServerMessage::MediaToggled {
                    peer_id: peer_id.clone(),
                    kind,
                    enabled,
                },
            )
            .await;
        Ok(())
    }

    async fn raise_hand(
        &mut self,
        peer_id: &PeerId,
        connection: ConnectionId,
        raised: bool,
    ) -> Result<(), HubError> {
        if self.authorized(peer_id, connection).await?.is_none() {
            return Ok(());
        }

        self.store
            .set_hand_raised(&self.room_id, peer_id, raised)
            .await?;

        let targets = self.active_connections_except(peer_id).await?;
        self.signaling
            .deliver(
                &self.room_id,
                targets,
                ServerMessage::HandRaised {
                    peer_id: peer_id.clone(),
                    raised,
                },
            )
            .await;
        Ok(())
    }

    async fn chat(
        &mut self,
        peer_id: &PeerId,
        connection: ConnectionId,
        message: String,
    ) -> Result<(), HubError> {
        let Some(sender) = self.authorized(peer_id, connection).await? else {
            return Ok(());
        };

        let entry = ChatEntry {
            id: Uuid::new_v4().to_string(),
            sender_id: sender.peer_id,
            sender_name: sender.display_name,
            message,
            timestamp: now_millis(),
        };
        self.store
            .push_chat(&self.room_id, entry.clone(), self.config.chat_history_limit)
            .await?;

        let targets = self
            .store
            .participants(&self.room_id)
            .await?
            .into_iter()
            .filter(|p| p.is_active)
            .map(|p| p.connection)
            .collect();
        self.signaling
            .deliver(&self.room_id, targets, ServerMessage::Chat { entry })
            .await;
        Ok(())
    }

    async fn speaking(
        &mut self,
        peer_id: &PeerId,
        connection: ConnectionId,
        speaking: bool,
    ) -> Result<(), HubError> {
        if self.authorized(peer_id, connection).await?.is_none() {
            return Ok(());
        }

        let targets = self.active_connections_except(peer_id).await?;
        self.signaling
            .deliver(
                &self.room_id,
                targets,
                ServerMessage::Speaking {
                    peer_id: peer_id.clone(),
                    speaking,
                },
            )
            .await;
        Ok(())
    }

    async fn list_participants(
        &mut self,
        peer_id: &PeerId,
        connection: ConnectionId,
    ) -> Result<Vec<ParticipantInfo>, HubError> {
        if self.authorized(peer_id, connection).await?.is_none() {
            return Ok(Vec::new());
        }

        Ok(self
            .active_others(peer_id)
            .await?
            .iter()
            .map(Participant::info)
            .collect())
    }

    async fn heartbeat(
        &mut self,
        peer_id: &PeerId,
        connection: ConnectionId,
    ) -> Result<(), HubError> {
        let Some(mut participant) = self.authorized(peer_id, connection).await? else {
            return Ok(());
        };

        participant.last_seen = now_millis();
        self.store
            .upsert_participant(&self.room_id, participant)
            .await?;
        Ok(())
    }

    async fn grace_expired(
        &mut self,
        peer_id: &PeerId,
        connection: ConnectionId,
    ) -> Result<(), HubError> {
        self.pending_removals.remove(peer_id);

        match self.store.participant(&self.room_id, peer_id).await? {
            Some(p) if p.connection == connection && !p.is_active => {
                self.store.remove_participant(&self.room_id, peer_id).await?;
                info!("Grace period over, removed {} from room {}", peer_id, self.room_id);
            }
            _ => debug!("Grace timer of {} outlived its record", peer_id),
        }
        Ok(())
    }

    /// The participant record, if `connection` is its live connection.
    async fn authorized(
        &self,
        peer_id: &PeerId,
        connection: ConnectionId,
    ) -> Result<Option<Participant>, HubError> {
        Ok(self
            .store
            .participant(&self.room_id, peer_id)
            .await?
            .filter(|p| p.is_active && p.connection == connection))
    }

    async fn active_others(&self, peer_id: &PeerId) -> Result<Vec<Participant>, HubError> {
        Ok(self
            .store
            .participants(&self.room_id)
            .await?
            .into_iter()
            .filter(|p| p.is_active && &p.peer_id != peer_id)
            .collect())
    }

    async fn active_connections_except(
        &self,
        peer_id: &PeerId,
    ) -> Result<Vec<ConnectionId>, HubError> {
        Ok(self
            .active_others(peer_id)
            .await?
            .into_iter()
            .map(|p| p.connection)
            .collect())
    }

    async fn broadcast_peer_left(&self, peer_id: &PeerId) -> Result<(), HubError> {
        let targets = self.active_connections_except(peer_id).await?;
        self.signaling
            .deliver(
                &self.room_id,
                targets,
                ServerMessage::PeerLeft {
                    peer_id: peer_id.clone(),
                },
            )
            .await;
        Ok(())
    }

    fn schedule_removal(&mut self, peer_id: PeerId, connection: ConnectionId) {
        let grace = self.config.grace_period;
        let command_tx = self.command_tx.clone();
        let key = peer_id.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(tx) = command_tx.upgrade() {
                let _ = tx.send(RoomCommand::GraceExpired {
                    peer_id,
                    connection,
                });
            }
        });

        if let Some(previous) = self.pending_removals.insert(key, timer) {
            previous.abort();
        }
    }

    fn cancel_removal(&mut self, peer_id: &PeerId) {
        if let Some(timer) = self.pending_removals.remove(peer_id) {
            timer.abort();
        }
    }
}
