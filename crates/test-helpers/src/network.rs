//! In-process network with partitions.

use async_trait::async_trait;
use chainbft_core::{Network, NetworkError, SubscriptionId};
use chainbft_messages::{MessageKind, NetworkMessage};
use chainbft_types::Address;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{trace, warn};

struct Subscription {
    address: Address,
    kind: MessageKind,
    sender: mpsc::Sender<NetworkMessage>,
}

#[derive(Default)]
struct HubState {
    subscriptions: HashMap<SubscriptionId, Subscription>,
    next_id: u64,
    /// If (a, b) is present, messages from a to b are dropped.
    partitions: HashSet<(Address, Address)>,
    closed: bool,
    delivered: u64,
    dropped: u64,
}

/// Shared switchboard. Each validator gets its own [`LoopbackNetwork`]
/// endpoint from [`LoopbackHub::endpoint`].
#[derive(Clone, Default)]
pub struct LoopbackHub {
    state: Arc<Mutex<HubState>>,
}

impl std::fmt::Debug for LoopbackHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.state.lock();
        f.debug_struct("LoopbackHub")
            .field("subscriptions", &s.subscriptions.len())
            .field("partitions", &s.partitions.len())
            .field("closed", &s.closed)
            .finish()
    }
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint sending as, and receiving for, `address`.
    pub fn endpoint(&self, address: Address) -> LoopbackNetwork {
        LoopbackNetwork {
            address,
            hub: self.clone(),
        }
    }

    // ─── Partition Management ───

    pub fn is_partitioned(&self, from: &Address, to: &Address) -> bool {
        self.state
            .lock()
            .partitions
            .contains(&(from.clone(), to.clone()))
    }

    /// Drop messages from `from` to `to`.
    pub fn partition_unidirectional(&self, from: &Address, to: &Address) {
        self.state
            .lock()
            .partitions
            .insert((from.clone(), to.clone()));
    }

    pub fn partition_bidirectional(&self, a: &Address, b: &Address) {
        let mut s = self.state.lock();
        s.partitions.insert((a.clone(), b.clone()));
        s.partitions.insert((b.clone(), a.clone()));
    }

    /// Cut `node` off from everyone in `others`, both ways.
    pub fn isolate(&self, node: &Address, others: &[Address]) {
        for other in others.iter().filter(|o| *o != node) {
            self.partition_bidirectional(node, other);
        }
    }

    pub fn heal_all(&self) {
        self.state.lock().partitions.clear();
    }

    // ─── Stats ───

    pub fn delivered(&self) -> u64 {
        self.state.lock().delivered
    }

    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Refuse every later send.
    pub fn shutdown(&self) {
        let mut s = self.state.lock();
        s.closed = true;
        s.subscriptions.clear();
    }
}

/// One validator's view of a [`LoopbackHub`].
#[derive(Debug, Clone)]
pub struct LoopbackNetwork {
    address: Address,
    hub: LoopbackHub,
}

impl LoopbackNetwork {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn hub(&self) -> &LoopbackHub {
        &self.hub
    }
}

#[async_trait]
impl Network for LoopbackNetwork {
    fn subscribe(
        &self,
        kind: MessageKind,
        sender: mpsc::Sender<NetworkMessage>,
    ) -> Result<SubscriptionId, NetworkError> {
        let mut s = self.hub.state.lock();
        if s.closed {
            return Err(NetworkError::Closed);
        }
        s.next_id += 1;
        let id = SubscriptionId(s.next_id);
        s.subscriptions.insert(
            id,
            Subscription {
                address: self.address.clone(),
                kind,
                sender,
            },
        );
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), NetworkError> {
        self.hub
            .state
            .lock()
            .subscriptions
            .remove(&id)
            .map(|_| ())
            .ok_or(NetworkError::UnknownSubscription(id))
    }

    async fn send_message(
        &self,
        message: NetworkMessage,
        targets: Vec<Address>,
    ) -> Result<(), NetworkError> {
        let mut s = self.hub.state.lock();
        if s.closed {
            return Err(NetworkError::Closed);
        }
        let kind = message.kind();
        let mut delivered = 0;
        let mut dropped = 0;
        for target in &targets {
            if s.partitions.contains(&(self.address.clone(), target.clone())) {
                trace!(from = %self.address, to = %target, "Partitioned, dropping");
                dropped += 1;
                continue;
            }
            for sub in s
                .subscriptions
                .values()
                .filter(|sub| sub.address == *target && sub.kind == kind)
            {
                match sub.sender.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        warn!(to = %target, kind = kind.as_str(), error = %e, "Inbound queue rejected message");
                        dropped += 1;
                    }
                }
            }
        }
        s.delivered += delivered;
        s.dropped += dropped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainbft_messages::{ConsensusMessage, ProposalMsg};
    use chainbft_types::ProposalId;

    fn message(from: &Address) -> NetworkMessage {
        let proposal = ProposalMsg {
            proposal_view: 1,
            proposal_id: ProposalId::new(vec![1]),
            timestamp: 0,
            justify_qc: vec![],
            sign: None,
        };
        NetworkMessage::new(&proposal, "log-1", from.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_delivers_by_address_and_kind() {
        let hub = LoopbackHub::new();
        let a = hub.endpoint(Address::new("a"));
        let b = hub.endpoint(Address::new("b"));
        let (tx, mut rx) = mpsc::channel(4);
        let (vote_tx, mut vote_rx) = mpsc::channel(4);
        b.subscribe(MessageKind::Proposal, tx).unwrap();
        b.subscribe(MessageKind::Vote, vote_tx).unwrap();

        a.send_message(message(a.address()), vec![Address::new("b")])
            .await
            .unwrap();
        let got = rx.recv().await.unwrap();
        assert_eq!(got.kind(), ProposalMsg::KIND);
        assert!(vote_rx.try_recv().is_err());
        assert_eq!(hub.delivered(), 1);
    }

    #[tokio::test]
    async fn test_partition_drops_and_heals() {
        let hub = LoopbackHub::new();
        let a = hub.endpoint(Address::new("a"));
        let b = hub.endpoint(Address::new("b"));
        let (tx, mut rx) = mpsc::channel(4);
        b.subscribe(MessageKind::Proposal, tx).unwrap();

        hub.partition_unidirectional(a.address(), b.address());
        a.send_message(message(a.address()), vec![b.address().clone()])
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(hub.dropped(), 1);

        hub.heal_all();
        a.send_message(message(a.address()), vec![b.address().clone()])
            .await
            .unwrap();
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_unsubscribe_and_shutdown() {
        let hub = LoopbackHub::new();
        let a = hub.endpoint(Address::new("a"));
        let (tx, _rx) = mpsc::channel(4);
        let id = a.subscribe(MessageKind::Vote, tx).unwrap();
        assert_eq!(hub.subscription_count(), 1);
        a.unsubscribe(id).unwrap();
        assert_eq!(
            a.unsubscribe(id),
            Err(NetworkError::UnknownSubscription(id))
        );

        hub.shutdown();
        assert_eq!(
            a.send_message(message(a.address()), vec![]).await,
            Err(NetworkError::Closed)
        );
    }
}
