mod envelope;
mod local_broker;

pub use envelope::{Delivery, Envelope};
pub use local_broker::LocalBroker;

use async_trait::async_trait;
use futures::stream::BoxStream;

/// Publish/subscribe channel between hub instances.
///
/// Every instance publishes room output here and delivers what it receives
/// to whichever of the targeted connections it holds locally.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, envelope: Envelope) -> anyhow::Result<()>;

    fn subscribe(&self) -> BoxStream<'static, Envelope>;
}
