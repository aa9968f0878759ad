//! The SMR orchestrator.
//!
//! Ties the pending tree, pacemaker and safety rules together and drives the
//! proposal/vote protocol. `Smr` is synchronous and performs no I/O: every
//! handler returns the [`Action`]s its runner should dispatch.
//!
//! # Flow
//!
//! - Leader: [`Smr::process_proposal`] → signed `ProposalMsg` to every other validator
//! - Replica: `ProposalMsg` → safety checks → pacemaker → tree insert → `VoteMsg` to next leader
//! - Next leader: `VoteMsg` → signature cache → quorum → pacemaker + highQC

use crate::config::SmrConfig;
use crate::crypto::SmrCrypto;
use crate::error::{SafetyError, SmrError, TreeError};
use crate::pacemaker::{DefaultPacemaker, Pacemaker};
use crate::qc_tree::QcPendingTree;
use crate::safety_rules::{DefaultSafetyRules, SafetyRules};
use chainbft_core::{Action, LedgerError, LedgerRely, ProposerElection};
use chainbft_messages::{CodecError, MessageKind, NetworkMessage, ProposalMsg, VoteMsg};
use chainbft_types::{
    Address, BlockInfo, LedgerCommitInfo, ProposalId, QuorumCert, QuorumCertSign, VoteInfo,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, trace, warn};

/// A proposal this node has made or accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalProposal {
    pub timestamp: i64,
    pub proposer: Address,
}

/// Result of [`Smr::reset_proposer_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOutcome {
    /// Whether the ledger must be truncated back to the justified block.
    pub truncate: bool,

    /// Justification to embed in the next mined block.
    pub justify: QuorumCert,
}

/// Chained-HotStuff replication state machine.
pub struct Smr {
    config: SmrConfig,
    crypto: Arc<SmrCrypto>,
    election: Arc<dyn ProposerElection>,
    tree: Arc<QcPendingTree>,
    pacemaker: Box<dyn Pacemaker>,
    safety: Box<dyn SafetyRules>,

    /// Highest view the local ledger is known to have reached.
    ledger_state: u64,

    /// Proposals made or accepted, keyed by id.
    local_proposal: HashMap<ProposalId, LocalProposal>,

    /// Vote signatures collected per proposal.
    qc_vote_msgs: HashMap<ProposalId, Vec<QuorumCertSign>>,

    now: Duration,
}

impl std::fmt::Debug for Smr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Smr")
            .field("address", self.crypto.address())
            .field("current_view", &self.pacemaker.current_view())
            .field("ledger_state", &self.ledger_state)
            .field("tree", &self.tree)
            .finish()
    }
}

impl Smr {
    /// Create an SMR with the default pacemaker and safety rules.
    ///
    /// The pacemaker starts at the view of the tree's highQC.
    pub fn new(
        config: SmrConfig,
        crypto: Arc<SmrCrypto>,
        election: Arc<dyn ProposerElection>,
        tree: Arc<QcPendingTree>,
    ) -> Self {
        let initial_view = tree
            .high_qc()
            .map(|qc| qc.proposal_view())
            .unwrap_or_default();
        let pacemaker = Box::new(DefaultPacemaker::new(initial_view));
        let safety = Box::new(DefaultSafetyRules::new(&config, crypto.clone()));
        Self::with_components(config, crypto, election, tree, pacemaker, safety)
    }

    /// Create an SMR with caller-supplied pacemaker and safety rules.
    pub fn with_components(
        config: SmrConfig,
        crypto: Arc<SmrCrypto>,
        election: Arc<dyn ProposerElection>,
        tree: Arc<QcPendingTree>,
        pacemaker: Box<dyn Pacemaker>,
        safety: Box<dyn SafetyRules>,
    ) -> Self {
        let ledger_state = tree.root_qc().proposal_view();
        Self {
            config,
            crypto,
            election,
            tree,
            pacemaker,
            safety,
            ledger_state,
            local_proposal: HashMap::new(),
            qc_vote_msgs: HashMap::new(),
            now: Duration::ZERO,
        }
    }

    /// Bootstrap from the ledger: config from its consensus section, tree
    /// rebuilt from its last blocks.
    pub fn from_ledger(
        crypto: Arc<SmrCrypto>,
        election: Arc<dyn ProposerElection>,
        ledger: &dyn LedgerRely,
        start_height: u64,
    ) -> Result<Self, SmrError> {
        let config = SmrConfig::from_consensus_conf(&ledger.get_consensus_conf()?)?;
        let tree = Arc::new(QcPendingTree::init_qc_tree(start_height, ledger)?);
        let tip = ledger.query_tip_block_header()?;
        let mut smr = Self::new(config, crypto, election, tree);
        smr.ledger_state = tip.height;
        Ok(smr)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    /// Set the current time. Proposal timestamps are taken from it.
    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    pub fn address(&self) -> &Address {
        self.crypto.address()
    }

    pub fn config(&self) -> &SmrConfig {
        &self.config
    }

    /// Shared handle to the pending tree for concurrent readers.
    pub fn qc_tree(&self) -> Arc<QcPendingTree> {
        self.tree.clone()
    }

    pub fn root_qc(&self) -> QuorumCert {
        self.tree.root_qc()
    }

    pub fn current_view(&self) -> u64 {
        self.pacemaker.current_view()
    }

    pub fn ledger_state(&self) -> u64 {
        self.ledger_state
    }

    /// Signatures collected for `id`.
    pub fn votes(&self, id: &ProposalId) -> &[QuorumCertSign] {
        self.qc_vote_msgs
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Seed the vote cache during restart. Must run before the runner starts.
    pub fn load_votes(&mut self, id: ProposalId, signs: Vec<QuorumCertSign>) {
        let cached = self.qc_vote_msgs.entry(id).or_default();
        for sign in signs {
            merge_sign(cached, sign);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inbound dispatch
    // ═══════════════════════════════════════════════════════════════════════

    /// Handle one inbound network message.
    pub fn handle_message(&mut self, msg: &NetworkMessage) -> Result<Vec<Action>, SmrError> {
        let span = info_span!(
            "smr_message",
            logid = %msg.header.logid,
            kind = msg.kind().as_str(),
            local = %self.crypto.address(),
        );
        let _guard = span.enter();
        match msg.kind() {
            MessageKind::Proposal => self.handle_proposal(msg),
            MessageKind::Vote => self.handle_vote(msg),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Leader path
    // ═══════════════════════════════════════════════════════════════════════

    /// Propose `proposal_id` at `view` extending `parent_id`.
    pub fn process_proposal(
        &mut self,
        view: u64,
        proposal_id: ProposalId,
        parent_id: ProposalId,
        validators: &[Address],
    ) -> Result<Vec<Action>, SmrError> {
        let current = self.pacemaker.current_view();
        let genesis_view = self.tree.genesis_qc().proposal_view();
        if let Some(locked) = self.tree.locked_qc() {
            if current < locked.proposal_view() && current != genesis_view + 1 {
                return Err(SmrError::TooLowNewProposal {
                    view: current,
                    locked_view: locked.proposal_view(),
                });
            }
        }
        if self.tree.high_qc().is_none() {
            return Err(SmrError::EmptyHighQc);
        }
        if self.local_proposal.contains_key(&proposal_id) {
            return Err(SmrError::SameProposalNotify(proposal_id));
        }
        if validators.is_empty() {
            return Err(SmrError::EmptyValidators);
        }

        let justify = self.reload_justify_qc(&parent_id)?;
        let justify_qc = encode_qc(&justify)?;
        let timestamp = self.now.as_secs() as i64;
        let sign = self
            .crypto
            .sign_proposal(view, &proposal_id, timestamp, &justify_qc)?;

        let proposal = ProposalMsg {
            proposal_view: view,
            proposal_id: proposal_id.clone(),
            timestamp,
            justify_qc,
            sign: Some(sign),
        };
        let local = self.crypto.address().clone();
        let logid = self.logid(view);
        let message = NetworkMessage::new(&proposal, logid.as_str(), local.clone())?;

        let mut actions = Vec::new();
        let targets: Vec<Address> = validators.iter().filter(|v| **v != local).cloned().collect();
        if !targets.is_empty() {
            actions.push(Action::Send { message, targets });
        }

        self.local_proposal.insert(
            proposal_id.clone(),
            LocalProposal {
                timestamp,
                proposer: local,
            },
        );
        let vote_info = VoteInfo::new(
            proposal_id.clone(),
            view,
            justify.proposal_id().clone(),
            justify.proposal_view(),
        );
        self.tree
            .update_qc_status(QuorumCert::unsigned(vote_info.clone()))?;

        info!(
            view,
            proposal = %proposal_id,
            parent = %justify.proposal_id(),
            validators = validators.len(),
            "Proposed"
        );

        if validators.len() == 1 {
            actions.extend(self.vote_to_self(vote_info, &logid)?);
        }
        Ok(actions)
    }

    /// Build the certificate justifying `parent_id`.
    fn reload_justify_qc(&self, parent_id: &ProposalId) -> Result<QuorumCert, SmrError> {
        let genesis = self.tree.genesis_qc();
        if parent_id == genesis.proposal_id() {
            let high = self.tree.high_qc().ok_or(SmrError::EmptyHighQc)?;
            let signs = self.votes(high.proposal_id()).to_vec();
            return Ok(QuorumCert::new(
                high.vote_info,
                LedgerCommitInfo::default(),
                signs,
            ));
        }

        let node = self
            .tree
            .query_node(parent_id)
            .ok_or_else(|| SmrError::EmptyTarget(parent_id.clone()))?;
        let signs = self.votes(parent_id);
        if signs.is_empty() {
            return Err(SmrError::JustifyVotesEmpty(parent_id.clone()));
        }
        let ledger_commit_info = LedgerCommitInfo::for_vote(&node.qc.vote_info);
        Ok(QuorumCert::new(
            node.qc.vote_info,
            ledger_commit_info,
            signs.to_vec(),
        ))
    }

    /// Only the genesis certificate itself may skip justify validation.
    fn is_genesis_justify(&self, justify: &QuorumCert) -> bool {
        justify.vote_info == self.tree.genesis_qc().vote_info
    }

    fn vote_to_self(&mut self, vote_info: VoteInfo, logid: &str) -> Result<Vec<Action>, SmrError> {
        let sign = self.crypto.sign_vote(&vote_info)?;
        let ledger_commit_info = LedgerCommitInfo::for_vote(&vote_info);
        self.aggregate_vote(
            QuorumCert::new(vote_info, ledger_commit_info, vec![sign]),
            logid,
        )
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Replica path
    // ═══════════════════════════════════════════════════════════════════════

    fn handle_proposal(&mut self, msg: &NetworkMessage) -> Result<Vec<Action>, SmrError> {
        let proposal: ProposalMsg = msg.decode_payload()?;
        let logid = msg.header.logid.as_str();
        let view = proposal.proposal_view;
        let id = proposal.proposal_id.clone();

        let sign = proposal.sign.as_ref().ok_or(SmrError::MissingProposalSign)?;
        self.crypto.verify_proposal(
            view,
            &id,
            proposal.timestamp,
            &proposal.justify_qc,
            sign,
        )?;
        if !self.election.get_validators(view).contains(&sign.address) {
            return Err(SafetyError::SignerNotValidator(sign.address.clone()).into());
        }

        if let Some(known) = self.local_proposal.get(&id) {
            if known.proposer != sign.address {
                return Err(SmrError::ProposerMismatch {
                    id,
                    known: known.proposer.clone(),
                    claimed: sign.address.clone(),
                });
            }
            trace!(proposal = %id, "Duplicate proposal");
            return Ok(vec![]);
        }

        let justify = proposal.justify()?;
        let vote_info = VoteInfo::new(
            id.clone(),
            view,
            justify.proposal_id().clone(),
            justify.proposal_view(),
        );
        let proposal_qc = QuorumCert::unsigned(vote_info.clone());

        if !self.is_genesis_justify(&justify) {
            let validators = self.election.get_validators(justify.proposal_view());
            self.safety
                .check_proposal(&proposal_qc, &justify, &validators, &self.tree)?;
        }

        if self.ledger_state.saturating_add(self.config.strict_window) < view {
            return Err(SmrError::OutdatedLedger {
                ledger_state: self.ledger_state,
                view,
            });
        }

        let mut actions = Vec::new();
        if self.pacemaker.advance_view(Some(&justify))? {
            match self.election.get_leader(view) {
                Some(leader) if leader != *self.crypto.address() && leader != sign.address => {
                    debug!(view, leader = %leader, "Forwarding proposal to view leader");
                    actions.push(Action::Send {
                        message: msg.clone(),
                        targets: vec![leader],
                    });
                }
                _ => {}
            }
        }

        if !justify.ledger_commit_info.is_empty() {
            self.safety.update_preferred_round(justify.proposal_view());
            self.tree.update_commit(justify.proposal_id());
        }

        self.safety
            .check_pacemaker(view, self.pacemaker.current_view())?;
        if !self.safety.vote_proposal(&id, view, &justify) {
            return Err(SmrError::VoteProposal(id));
        }

        self.local_proposal.insert(
            id.clone(),
            LocalProposal {
                timestamp: proposal.timestamp,
                proposer: sign.address.clone(),
            },
        );
        self.tree.update_qc_status(proposal_qc)?;

        let next_view = view + 1;
        let next_leader = self
            .election
            .get_leader(next_view)
            .ok_or(SmrError::EmptyLeader(next_view))?;
        let vote_sign = self.crypto.sign_vote(&vote_info)?;
        let ledger_commit_info = LedgerCommitInfo::for_vote(&vote_info);

        debug!(
            view,
            proposal = %id,
            next_leader = %next_leader,
            "Voting for proposal"
        );

        if next_leader == *self.crypto.address() {
            actions.extend(self.aggregate_vote(
                QuorumCert::new(vote_info, ledger_commit_info, vec![vote_sign]),
                logid,
            )?);
        } else {
            let vote = VoteMsg::new(&vote_info, &ledger_commit_info, vote_sign)?;
            let message = NetworkMessage::new(&vote, logid, self.crypto.address().clone())?;
            actions.push(Action::Send {
                message,
                targets: vec![next_leader],
            });
        }
        Ok(actions)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Vote aggregation
    // ═══════════════════════════════════════════════════════════════════════

    fn handle_vote(&mut self, msg: &NetworkMessage) -> Result<Vec<Action>, SmrError> {
        let vote: VoteMsg = msg.decode_payload()?;
        let qc = vote.to_quorum_cert()?;
        self.aggregate_vote(qc, &msg.header.logid)
    }

    fn aggregate_vote(&mut self, qc: QuorumCert, logid: &str) -> Result<Vec<Action>, SmrError> {
        if qc.ledger_commit_info.vote_info_hash != qc.vote_info.hash() {
            return Err(SmrError::InvalidVoteInfoHash);
        }
        let validators = self.election.get_validators(qc.proposal_view());
        self.safety.check_vote(&qc, logid, &validators)?;

        let id = qc.proposal_id().clone();
        if !self.local_proposal.contains_key(&id) || !self.tree.contains(&id) {
            debug!(proposal = %id, "Vote arrived before its proposal, dropping");
            return Ok(vec![]);
        }

        let matches_node = self
            .tree
            .query_node(&id)
            .is_some_and(|node| node.qc.vote_info == qc.vote_info);
        if !matches_node {
            debug!(
                proposal = %id,
                parent = %qc.parent_id(),
                parent_view = qc.parent_view(),
                "Vote does not match local proposal, dropping"
            );
            return Ok(vec![]);
        }

        let sign = qc
            .sign_infos
            .first()
            .cloned()
            .ok_or(SafetyError::NoSigns)?;
        let cached = self.qc_vote_msgs.entry(id.clone()).or_default();
        merge_sign(cached, sign);
        let have = cached.len();

        if self.safety.cal_votes_threshold(have, validators.len()) {
            let aggregated = QuorumCert::new(qc.vote_info, qc.ledger_commit_info, cached.clone());
            if self.pacemaker.advance_view(Some(&aggregated))? {
                info!(
                    proposal = %id,
                    votes = have,
                    view = self.pacemaker.current_view(),
                    "Quorum reached, advanced view"
                );
            }
            self.tree.update_high_qc(&id);
        } else {
            trace!(proposal = %id, votes = have, total = validators.len(), "Vote cached");
        }
        Ok(vec![])
    }

    /// Merge a justification's signatures and try to move highQC to it.
    pub fn update_justify_qc_status(&mut self, qc: &QuorumCert) -> Result<(), SmrError> {
        let id = qc.proposal_id();
        if id.is_empty() {
            return Err(TreeError::NoValidQc.into());
        }
        let cached = self.qc_vote_msgs.entry(id.clone()).or_default();
        for sign in &qc.sign_infos {
            merge_sign(cached, sign.clone());
        }
        self.tree.update_high_qc(id);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Ledger-facing operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Validate `block` against its justification.
    pub fn check_proposal(
        &self,
        block: &BlockInfo,
        justify: &QuorumCert,
        validators: &[Address],
    ) -> Result<(), SmrError> {
        if self.is_genesis_justify(justify) {
            return Ok(());
        }
        let proposal = QuorumCert::unsigned(VoteInfo::new(
            block.id.clone(),
            block.height,
            justify.proposal_id().clone(),
            justify.proposal_view(),
        ));
        self.safety
            .check_proposal(&proposal, justify, validators, &self.tree)?;
        Ok(())
    }

    /// Catch up with a block accepted into the ledger.
    pub fn keep_up_with_block(
        &mut self,
        block: &BlockInfo,
        justify: Option<&QuorumCert>,
        validators: &[Address],
    ) -> Result<Vec<Action>, SmrError> {
        if let Some(justify) = justify {
            self.update_justify_qc_status(justify)?;
        }

        let mut actions = Vec::new();
        if block.proposer == *self.crypto.address() {
            match self.process_proposal(
                block.height,
                block.id.clone(),
                block.pre_hash.clone(),
                validators,
            ) {
                Ok(a) => actions.extend(a),
                Err(SmrError::SameProposalNotify(_)) | Err(SmrError::TooLowNewProposal { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let (parent_id, parent_view) = match justify {
            Some(j) => (j.proposal_id().clone(), j.proposal_view()),
            None => (block.pre_hash.clone(), block.height.saturating_sub(1)),
        };
        let node = QuorumCert::unsigned(VoteInfo::new(
            block.id.clone(),
            block.height,
            parent_id,
            parent_view,
        ));
        self.tree.update_qc_status(node.clone())?;
        self.tree.update_commit(&block.id);
        self.pacemaker.advance_view(Some(&node))?;
        self.ledger_state = block.height;

        debug!(
            height = block.height,
            block = %block.id,
            view = self.pacemaker.current_view(),
            "Caught up with block"
        );
        Ok(actions)
    }

    /// Repoint highQC at the newest block that still has a quorum of votes.
    ///
    /// Walks back from `tip` through `query_block` until a block in the tree
    /// has enough votes for its era, or the tree root is reached.
    pub fn reset_proposer_status<F>(
        &mut self,
        tip: &BlockInfo,
        query_block: F,
        validators: &[Address],
    ) -> Result<ResetOutcome, SmrError>
    where
        F: Fn(&ProposalId) -> Result<BlockInfo, LedgerError>,
    {
        if let Some(high) = self.tree.high_qc() {
            if *high.proposal_id() == tip.id && self.has_quorum_votes(&tip.id, tip.height, validators)
            {
                return Ok(ResetOutcome {
                    truncate: false,
                    justify: self.reload_justify_qc(&tip.id)?,
                });
            }
        }

        let root = self.tree.root_qc();
        let mut cursor = tip.clone();
        let mut found = None;
        loop {
            if self.tree.contains(&cursor.id)
                && self.has_quorum_votes(&cursor.id, cursor.height, validators)
            {
                found = Some(cursor.id.clone());
                break;
            }
            if cursor.height <= root.proposal_view() {
                break;
            }
            match query_block(&cursor.pre_hash) {
                Ok(parent) if parent.height >= cursor.height => {
                    warn!(
                        block = %cursor.id,
                        height = cursor.height,
                        parent_height = parent.height,
                        "Ancestor height does not decrease, stopping walk"
                    );
                    break;
                }
                Ok(parent) => cursor = parent,
                Err(e) => {
                    debug!(block = %cursor.pre_hash, error = %e, "Ancestor unavailable");
                    break;
                }
            }
        }

        let target = found.unwrap_or_else(|| root.proposal_id().clone());
        self.tree.enforce_update_high_qc(&target)?;
        let justify = match self.reload_justify_qc(&target) {
            Ok(qc) => qc,
            Err(SmrError::JustifyVotesEmpty(_)) => QuorumCert::unsigned(root.vote_info.clone()),
            Err(e) => return Err(e),
        };
        let truncate = target != tip.id;
        if truncate {
            warn!(
                tip = %tip.id,
                tip_height = tip.height,
                target = %target,
                "Proposer reset to earlier block, ledger truncation required"
            );
        }
        Ok(ResetOutcome { truncate, justify })
    }

    fn has_quorum_votes(&self, id: &ProposalId, view: u64, fallback: &[Address]) -> bool {
        let era = self.election.get_validators(view);
        let validators = if era.is_empty() { fallback } else { era.as_slice() };
        let have = self
            .votes(id)
            .iter()
            .filter(|s| validators.contains(&s.address))
            .count();
        self.safety.cal_votes_threshold(have, validators.len())
    }

    fn logid(&self, view: u64) -> String {
        format!("{}-{}", self.crypto.address(), view)
    }
}

/// Add `sign` unless its address already signed.
fn merge_sign(cached: &mut Vec<QuorumCertSign>, sign: QuorumCertSign) {
    if !cached.iter().any(|s| s.address == sign.address) {
        cached.push(sign);
    }
}

fn encode_qc(qc: &QuorumCert) -> Result<Vec<u8>, CodecError> {
    qc.encode()
        .map_err(|e| CodecError::SborEncode(format!("{:?}", e)))
}
