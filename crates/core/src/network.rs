//! Network contract consumed by the SMR runner.

use async_trait::async_trait;
use chainbft_messages::{MessageKind, NetworkMessage};
use chainbft_types::Address;
use thiserror::Error;
use tokio::sync::mpsc;

/// Handle returned by [`Network::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Errors reported by a [`Network`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("Unknown subscription {0:?}")]
    UnknownSubscription(SubscriptionId),

    #[error("Peer {0} is not reachable")]
    Unreachable(Address),

    #[error("Network is shut down")]
    Closed,
}

/// Subscribe-by-kind delivery plus best-effort targeted sends.
#[async_trait]
pub trait Network: Send + Sync {
    /// Deliver every inbound message of `kind` into `sender`.
    fn subscribe(
        &self,
        kind: MessageKind,
        sender: mpsc::Sender<NetworkMessage>,
    ) -> Result<SubscriptionId, NetworkError>;

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), NetworkError>;

    /// Send `message` to each of `targets`. Delivery is not guaranteed.
    async fn send_message(
        &self,
        message: NetworkMessage,
        targets: Vec<Address>,
    ) -> Result<(), NetworkError>;
}
