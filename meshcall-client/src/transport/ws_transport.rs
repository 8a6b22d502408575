use crate::config::BackoffConfig;
use crate::error::TransportError;
use crate::transport::{Backoff, SignalingTransport, TransportEvent};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use meshcall_core::{ClientMessage, ServerMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

struct Shared {
    connected: AtomicBool,
    shutdown: watch::Sender<bool>,
    drop_connection: Notify,
}

/// Signaling over a WebSocket that reconnects with exponential backoff.
///
/// Messages sent while disconnected are rejected rather than queued: after a
/// reconnect the session is rebuilt from scratch anyway.
pub struct WsTransport {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl WsTransport {
    pub fn connect(
        url: impl Into<String>,
        backoff: BackoffConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<TransportEvent>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        let shared = Arc::new(Shared {
            connected: AtomicBool::new(false),
            shutdown,
            drop_connection: Notify::new(),
        });

        let task = tokio::spawn(connection_loop(
            url.into(),
            Backoff::new(backoff),
            shared.clone(),
            outbound_rx,
            events_tx,
        ));

        let transport = Arc::new(Self {
            outbound,
            shared,
            task,
        });
        (transport, events_rx)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Drops the current socket; the loop reconnects on its usual schedule.
    pub fn force_reconnect(&self) {
        self.shared.drop_connection.notify_one();
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl SignalingTransport for WsTransport {
    async fn send(&self, msg: ClientMessage) -> Result<(), TransportError> {
        if *self.shared.shutdown.borrow() {
            return Err(TransportError::Closed);
        }
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.outbound.send(msg).map_err(|_| TransportError::Closed)
    }

    async fn shutdown(&self) {
        self.shared.shutdown.send_replace(true);
    }
}

async fn connection_loop(
    url: String,
    mut backoff: Backoff,
    shared: Arc<Shared>,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let mut shutdown = shared.shutdown.subscribe();

    loop {
        if *shutdown.borrow() {
            break;
        }

        info!("Connecting to signaling hub at {}", url);
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                backoff.reset();
                // Anything queued against the previous socket is stale.
                while outbound.try_recv().is_ok() {}
                shared.connected.store(true, Ordering::SeqCst);
                let _ = events.send(TransportEvent::Connected);

                let (mut write, mut read) = ws.split();

                loop {
                    tokio::select! {
                        msg = outbound.recv() => {
                            let Some(msg) = msg else { break };
                            let json = match serde_json::to_string(&msg) {
                                Ok(json) => json,
                                Err(e) => {
                                    warn!("Failed to encode {}: {}", msg.kind(), e);
                                    continue;
                                }
                            };
                            debug!("Sending {}", msg.kind());
                            if write.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }

                        frame = read.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerMessage>(text.as_str()) {
                                    Ok(msg) => {
                                        let _ = events.send(TransportEvent::Message(msg));
                                    }
                                    Err(e) => warn!("Unrecognized message from hub: {}", e),
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!("Signaling hub closed the connection");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!("Signaling socket error: {}", e);
                                break;
                            }
                        },

                        _ = shared.drop_connection.notified() => {
                            info!("Dropping signaling connection on request");
                            break;
                        }

                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                // Flush what was sent before the shutdown, typically `leave`.
                                while let Ok(msg) = outbound.try_recv() {
                                    if let Ok(json) = serde_json::to_string(&msg) {
                                        let _ = write.send(Message::Text(json.into())).await;
                                    }
                                }
                                let _ = write.send(Message::Close(None)).await;
                                break;
                            }
                        }
                    }
                }

                shared.connected.store(false, Ordering::SeqCst);
                let _ = events.send(TransportEvent::Disconnected);
            }
            Err(e) => warn!("Failed to connect to {}: {}", url, e),
        }

        if *shutdown.borrow() {
            break;
        }

        let delay = backoff.next_delay();
        info!("Reconnecting in {:?}", delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {}
        }
    }

    debug!("Signaling transport stopped");
}
