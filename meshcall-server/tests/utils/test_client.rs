use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use meshcall_core::utils::DEFAULT_SIGNALING_PATH;
use meshcall_core::{ClientMessage, Identity, PeerId, RoomId, ServerMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::signal_helpers::{QUIET_PERIOD_MS, SIGNAL_TIMEOUT_MS};

/// A signaling client speaking the JSON wire protocol over a real WebSocket.
pub struct TestClient {
    /// The peer ID this client joins as.
    pub peer_id: PeerId,
    /// The underlying WebSocket.
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect to the hub and consume the initial `ice-config`.
    pub async fn connect(addr: SocketAddr, peer_id: &str) -> Result<Self> {
        let mut client = Self::connect_raw(addr, peer_id).await?;
        match client.recv().await? {
            ServerMessage::IceConfig { .. } => Ok(client),
            other => bail!("Expected ice-config first, got {:?}", other),
        }
    }

    /// Connect without reading anything.
    pub async fn connect_raw(addr: SocketAddr, peer_id: &str) -> Result<Self> {
        let url = format!("ws://{addr}{DEFAULT_SIGNALING_PATH}");
        let (ws, _) = connect_async(url)
            .await
            .context("Failed to open WebSocket")?;
        tracing::debug!("[TestClient] {} connected", peer_id);

        Ok(Self {
            peer_id: PeerId::from(peer_id),
            ws,
        })
    }

    pub async fn send(&mut self, msg: &ClientMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.send_raw(&json).await
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.ws
            .send(Message::text(text.to_owned()))
            .await
            .context("Failed to send frame")
    }

    /// Join `room` and return the `peers` response.
    pub async fn join(&mut self, room: &str) -> Result<ServerMessage> {
        let identity = Identity::anonymous(self.peer_id.clone());
        self.join_as(room, identity).await
    }

    pub async fn join_as(&mut self, room: &str, identity: Identity) -> Result<ServerMessage> {
        self.send(&ClientMessage::join(RoomId::from(room), &identity))
            .await?;
        self.recv_until(|m| matches!(m, ServerMessage::Peers { .. }))
            .await
    }

    /// Next server message, skipping control frames.
    pub async fn recv(&mut self) -> Result<ServerMessage> {
        self.recv_within(SIGNAL_TIMEOUT_MS).await
    }

    pub async fn recv_within(&mut self, timeout_ms: u64) -> Result<ServerMessage> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            let frame = tokio::time::timeout_at(deadline, self.ws.next())
                .await
                .context("Timeout waiting for server message")?;

            match frame {
                Some(Ok(Message::Text(text))) => {
                    let msg = serde_json::from_str(text.as_str())
                        .with_context(|| format!("Unparseable server message: {}", text))?;
                    tracing::debug!("[TestClient] {} received {:?}", self.peer_id, msg);
                    return Ok(msg);
                }
                Some(Ok(Message::Close(_))) | None => bail!("Connection closed"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => bail!("WebSocket error: {}", e),
            }
        }
    }

    /// Skip messages until one matches.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> Result<ServerMessage>
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        loop {
            let msg = self.recv().await?;
            if predicate(&msg) {
                return Ok(msg);
            }
        }
    }

    /// Fails if any server message arrives during the quiet period.
    pub async fn expect_silence(&mut self) -> Result<()> {
        match self.recv_within(QUIET_PERIOD_MS).await {
            Ok(msg) => bail!("Expected silence, got {:?}", msg),
            Err(_) => Ok(()),
        }
    }

    /// Waits until the hub closes this connection.
    pub async fn expect_closed(&mut self) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(SIGNAL_TIMEOUT_MS);

        loop {
            let frame = tokio::time::timeout_at(deadline, self.ws.next())
                .await
                .context("Timeout waiting for the hub to close the connection")?;

            match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return Ok(()),
                Some(Ok(_)) => continue,
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws
            .close(None)
            .await
            .context("Failed to close WebSocket")
    }
}
