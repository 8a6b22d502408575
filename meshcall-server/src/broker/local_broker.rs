use crate::broker::{Broker, Envelope};
use anyhow::Context;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 4096;

/// In-process broker. Clones share one channel, so hubs built from clones of
/// the same `LocalBroker` see each other's traffic.
#[derive(Clone)]
pub struct LocalBroker {
    tx: broadcast::Sender<Envelope>,
}

impl LocalBroker {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl Default for LocalBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for LocalBroker {
    async fn publish(&self, envelope: Envelope) -> anyhow::Result<()> {
        if self.tx.receiver_count() == 0 {
            return Ok(());
        }
        self.tx
            .send(envelope)
            .map(|_| ())
            .context("local broker channel closed")
    }

    fn subscribe(&self) -> BoxStream<'static, Envelope> {
        let rx = self.tx.subscribe();

        stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) => return Some((envelope, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Broker subscriber lagged, {} envelopes dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
