//! In-process cluster driving several SMR instances over a FIFO queue.

#![allow(dead_code)]

use chainbft_bft::{QcPendingTree, Smr, SmrConfig, SmrCrypto, SmrError};
use chainbft_core::Action;
use chainbft_messages::NetworkMessage;
use chainbft_test_helpers::{RoundRobinElection, TestValidators};
use chainbft_types::{Address, BlockInfo, Ed25519Client, ProposalId, QuorumCert, VoteInfo};
use std::collections::VecDeque;
use std::sync::Arc;

pub fn pid(n: u64) -> ProposalId {
    ProposalId::new(n.to_be_bytes().to_vec())
}

pub fn genesis() -> QuorumCert {
    QuorumCert::unsigned(VoteInfo::new(pid(0), 0, ProposalId::empty(), 0))
}

pub fn block(height: u64, proposer: &Address) -> BlockInfo {
    BlockInfo {
        id: pid(height),
        pre_hash: pid(height.saturating_sub(1)),
        height,
        proposer: proposer.clone(),
        timestamp: height as i64,
        consensus_storage: vec![],
    }
}

pub fn crypto(validators: &TestValidators, index: usize) -> Arc<SmrCrypto> {
    Arc::new(SmrCrypto::new(
        Arc::new(Ed25519Client),
        validators.keys[index].clone(),
    ))
}

/// Validators sharing a round-robin election and delivering in send order.
pub struct Cluster {
    pub validators: TestValidators,
    pub nodes: Vec<Smr>,
    queue: VecDeque<(usize, NetworkMessage)>,
    pub errors: Vec<(usize, SmrError)>,
}

impl Cluster {
    pub fn new(n: usize) -> Self {
        let validators = TestValidators::new(n);
        let election = Arc::new(RoundRobinElection::new(validators.addresses.clone()));
        let nodes = (0..n)
            .map(|i| {
                let tree = Arc::new(QcPendingTree::new(genesis(), genesis()));
                Smr::new(
                    SmrConfig::default(),
                    crypto(&validators, i),
                    election.clone(),
                    tree,
                )
            })
            .collect();
        Self {
            validators,
            nodes,
            queue: VecDeque::new(),
            errors: Vec::new(),
        }
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.validators.addresses.clone()
    }

    /// Index of the round-robin leader for `view`.
    pub fn leader(&self, view: u64) -> usize {
        (view.saturating_sub(1) % self.nodes.len() as u64) as usize
    }

    fn index_of(&self, address: &Address) -> Option<usize> {
        self.validators.addresses.iter().position(|a| a == address)
    }

    pub fn dispatch(&mut self, actions: Vec<Action>) {
        for Action::Send { message, targets } in actions {
            for target in targets {
                if let Some(index) = self.index_of(&target) {
                    self.queue.push_back((index, message.clone()));
                }
            }
        }
    }

    /// Have `node` propose `id` at `view` on top of `parent` and enqueue the result.
    pub fn propose(&mut self, node: usize, view: u64, id: ProposalId, parent: ProposalId) {
        let validators = self.addresses();
        let actions = self.nodes[node]
            .process_proposal(view, id, parent, &validators)
            .expect("proposal accepted by leader");
        self.dispatch(actions);
    }

    /// Deliver queued messages until the queue is empty.
    pub fn pump(&mut self) {
        while let Some((index, message)) = self.queue.pop_front() {
            match self.nodes[index].handle_message(&message) {
                Ok(actions) => self.dispatch(actions),
                Err(e) => self.errors.push((index, e)),
            }
        }
    }

    /// Let every node's ledger catch up with the block at `height`.
    pub fn ledger_follow(&mut self, height: u64, proposer: usize) {
        let proposer = self.validators.addresses[proposer].clone();
        let validators = self.addresses();
        let block = block(height, &proposer);
        let mut pending = Vec::new();
        for node in &mut self.nodes {
            pending.extend(
                node.keep_up_with_block(&block, None, &validators)
                    .expect("ledger block accepted"),
            );
        }
        self.dispatch(pending);
    }

    pub fn high_qc(&self, node: usize) -> ProposalId {
        self.nodes[node]
            .qc_tree()
            .high_qc()
            .map(|qc| qc.proposal_id().clone())
            .unwrap_or_default()
    }
}
