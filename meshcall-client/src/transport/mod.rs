mod backoff;
mod ws_transport;

pub use backoff::Backoff;
pub use ws_transport::WsTransport;

use crate::error::TransportError;
use async_trait::async_trait;
use meshcall_core::{ClientMessage, ServerMessage};

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A (re)connection succeeded. Everything negotiated before is stale.
    Connected,
    Message(ServerMessage),
    Disconnected,
}

/// Outbound half of the signaling channel. Inbound traffic arrives as
/// [`TransportEvent`]s on the receiver handed out alongside the transport.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn send(&self, msg: ClientMessage) -> Result<(), TransportError>;

    /// Stops reconnecting and closes the connection.
    async fn shutdown(&self) {}
}
