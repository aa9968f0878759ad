//! Legacy consensus-storage layout embedded in blocks.
//!
//! Blocks written before the current certificate layout store their
//! justification as a [`LegacyQuorumCert`] inside [`ConsensusStorage`], with
//! the vote record serialized as JSON. The converters here translate between
//! that layout and [`QuorumCert`] without losing ids, views or signatures.

use crate::{Address, LedgerCommitInfo, ProposalId, QuorumCert, QuorumCertSign, VoteInfo};
use sbor::prelude::*;

/// Signature entry in the legacy layout.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct LegacySignInfo {
    pub address: Address,
    pub public_key: String,
    pub sign: Vec<u8>,
}

/// Justification certificate in the legacy layout.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct LegacyQuorumCert {
    /// Id of the certified proposal.
    pub proposal_id: ProposalId,

    /// JSON-encoded [`VoteInfo`].
    pub proposal_msg: Vec<u8>,

    /// View of the certified proposal.
    pub view_number: u64,

    pub sign_infos: Vec<LegacySignInfo>,
}

/// Consensus section stored in every block.
#[derive(Debug, Clone, PartialEq, Eq, Default, BasicSbor)]
pub struct ConsensusStorage {
    /// Justification for the block's parent. `None` for the first blocks of a chain.
    pub justify: Option<LegacyQuorumCert>,

    /// Election term the block was produced in.
    pub cur_term: u64,

    /// Block number within the term.
    pub cur_block_num: u64,
}

impl ConsensusStorage {
    pub fn encode(&self) -> Result<Vec<u8>, LegacyError> {
        basic_encode(self).map_err(|e| LegacyError::Encode(format!("{:?}", e)))
    }

    /// Decode the consensus section of a block. Empty input yields the default section.
    pub fn decode(bytes: &[u8]) -> Result<Self, LegacyError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        basic_decode(bytes).map_err(|e| LegacyError::Decode(format!("{:?}", e)))
    }
}

/// Errors converting between certificate layouts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LegacyError {
    #[error("Failed to encode legacy structure: {0}")]
    Encode(String),

    #[error("Failed to decode legacy structure: {0}")]
    Decode(String),

    #[error("Malformed vote info JSON: {0}")]
    VoteInfoJson(String),

    /// The JSON vote record disagrees with the outer certificate fields.
    #[error("Legacy certificate for {outer} carries vote info for {inner}")]
    Inconsistent {
        outer: ProposalId,
        inner: ProposalId,
    },
}

/// Convert a certificate to the legacy layout.
pub fn new_to_old_qc(qc: &QuorumCert) -> Result<LegacyQuorumCert, LegacyError> {
    let proposal_msg = serde_json::to_vec(&qc.vote_info)
        .map_err(|e| LegacyError::VoteInfoJson(e.to_string()))?;
    let sign_infos = qc
        .sign_infos
        .iter()
        .map(|s| LegacySignInfo {
            address: s.address.clone(),
            public_key: s.public_key.clone(),
            sign: s.sign.clone(),
        })
        .collect();

    Ok(LegacyQuorumCert {
        proposal_id: qc.vote_info.proposal_id.clone(),
        proposal_msg,
        view_number: qc.vote_info.proposal_view,
        sign_infos,
    })
}

/// Convert a legacy certificate to the current layout.
///
/// The legacy layout has no commit hint, so the result carries an empty one.
pub fn old_qc_to_new(old: &LegacyQuorumCert) -> Result<QuorumCert, LegacyError> {
    let vote_info: VoteInfo = serde_json::from_slice(&old.proposal_msg)
        .map_err(|e| LegacyError::VoteInfoJson(e.to_string()))?;
    if vote_info.proposal_id != old.proposal_id || vote_info.proposal_view != old.view_number {
        return Err(LegacyError::Inconsistent {
            outer: old.proposal_id.clone(),
            inner: vote_info.proposal_id,
        });
    }

    let sign_infos = old
        .sign_infos
        .iter()
        .map(|s| QuorumCertSign {
            address: s.address.clone(),
            public_key: s.public_key.clone(),
            sign: s.sign.clone(),
        })
        .collect();

    Ok(QuorumCert::new(
        vote_info,
        LedgerCommitInfo::default(),
        sign_infos,
    ))
}
