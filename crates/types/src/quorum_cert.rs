//! Quorum certificate types.
//!
//! A [`QuorumCert`] is a plain value: the vote it certifies, an optional hint
//! about the ledger state its signers consider committed, and the signatures
//! gathered so far. Nothing here validates; thresholds and signature checks
//! belong to the safety rules.

use crate::signing::push_len_prefixed;
use crate::{Address, Hash, ProposalId};
use sbor::prelude::*;
use serde::{Deserialize, Serialize};

/// The proposal being voted on and the proposal it extends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, BasicSbor, Serialize, Deserialize)]
pub struct VoteInfo {
    /// Id of the proposal (block id).
    pub proposal_id: ProposalId,

    /// View the proposal was made in.
    pub proposal_view: u64,

    /// Id of the parent proposal.
    pub parent_id: ProposalId,

    /// View of the parent proposal.
    pub parent_view: u64,
}

impl VoteInfo {
    /// Create a vote record.
    pub fn new(
        proposal_id: ProposalId,
        proposal_view: u64,
        parent_id: ProposalId,
        parent_view: u64,
    ) -> Self {
        Self {
            proposal_id,
            proposal_view,
            parent_id,
            parent_view,
        }
    }

    /// Deterministic byte layout used for hashing and signing.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(24 + self.proposal_id.0.len() + self.parent_id.0.len());
        push_len_prefixed(&mut out, self.proposal_id.as_bytes());
        out.extend_from_slice(&self.proposal_view.to_le_bytes());
        push_len_prefixed(&mut out, self.parent_id.as_bytes());
        out.extend_from_slice(&self.parent_view.to_le_bytes());
        out
    }

    /// Hash carried in [`LedgerCommitInfo::vote_info_hash`].
    pub fn hash(&self) -> Hash {
        Hash::from_bytes(&self.canonical_bytes())
    }
}

/// Ledger state a voter believes is committed.
///
/// An empty `commit_state_id` means the certificate carries no commit hint.
#[derive(Debug, Clone, PartialEq, Eq, Default, BasicSbor)]
pub struct LedgerCommitInfo {
    /// Proposal whose state the signer considers committed.
    pub commit_state_id: ProposalId,

    /// Hash of the vote info this hint belongs to.
    pub vote_info_hash: Hash,
}

impl LedgerCommitInfo {
    /// Hint pointing at the voted proposal itself.
    pub fn for_vote(vote_info: &VoteInfo) -> Self {
        Self {
            commit_state_id: vote_info.proposal_id.clone(),
            vote_info_hash: vote_info.hash(),
        }
    }

    /// Whether this certificate carries a commit hint.
    pub fn is_empty(&self) -> bool {
        self.commit_state_id.is_empty()
    }
}

/// One validator's signature inside a certificate or message.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct QuorumCertSign {
    /// Signer account address.
    pub address: Address,

    /// JSON-encoded public key of the signer.
    pub public_key: String,

    /// Raw signature bytes.
    pub sign: Vec<u8>,
}

/// Vote record, ledger hint and collected signatures.
#[derive(Debug, Clone, PartialEq, Eq, Default, BasicSbor)]
pub struct QuorumCert {
    /// What is being certified.
    pub vote_info: VoteInfo,

    /// Commit hint, possibly empty.
    pub ledger_commit_info: LedgerCommitInfo,

    /// Signatures gathered for `vote_info`.
    pub sign_infos: Vec<QuorumCertSign>,
}

impl QuorumCert {
    /// Construct a certificate. No validation is performed.
    pub fn new(
        vote_info: VoteInfo,
        ledger_commit_info: LedgerCommitInfo,
        sign_infos: Vec<QuorumCertSign>,
    ) -> Self {
        Self {
            vote_info,
            ledger_commit_info,
            sign_infos,
        }
    }

    /// Certificate with no hint and no signatures, as carried by proposal nodes.
    pub fn unsigned(vote_info: VoteInfo) -> Self {
        Self::new(vote_info, LedgerCommitInfo::default(), Vec::new())
    }

    pub fn proposal_id(&self) -> &ProposalId {
        &self.vote_info.proposal_id
    }

    pub fn proposal_view(&self) -> u64 {
        self.vote_info.proposal_view
    }

    pub fn parent_id(&self) -> &ProposalId {
        &self.vote_info.parent_id
    }

    pub fn parent_view(&self) -> u64 {
        self.vote_info.parent_view
    }

    /// Add a signature unless its address already signed. Returns whether it was added.
    pub fn add_sign(&mut self, sign: QuorumCertSign) -> bool {
        if self.has_signer(&sign.address) {
            return false;
        }
        self.sign_infos.push(sign);
        true
    }

    /// Whether `address` is among the signers.
    pub fn has_signer(&self, address: &Address) -> bool {
        self.sign_infos.iter().any(|s| &s.address == address)
    }

    /// Encode for embedding in messages.
    pub fn encode(&self) -> Result<Vec<u8>, sbor::EncodeError> {
        basic_encode(self)
    }

    /// Decode a certificate produced by [`QuorumCert::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, sbor::DecodeError> {
        basic_decode(bytes)
    }
}
