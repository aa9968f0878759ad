//! Proposal message broadcast by the leader of a view.

use crate::codec::{decode_err, encode_err, non_empty, CodecError, ConsensusMessage};
use crate::MessageKind;
use chainbft_types::{ProposalId, QuorumCert, QuorumCertSign};
use sbor::prelude::*;

/// A leader's proposal for `proposal_view`, justified by the certificate of its parent.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct ProposalMsg {
    /// View the proposal is made in.
    pub proposal_view: u64,

    /// Id of the proposed block.
    pub proposal_id: ProposalId,

    /// Unix timestamp (seconds) when the leader proposed.
    pub timestamp: i64,

    /// Encoded [`QuorumCert`] for the parent proposal.
    pub justify_qc: Vec<u8>,

    /// Leader signature. Proposals without one are dropped.
    pub sign: Option<QuorumCertSign>,
}

impl ProposalMsg {
    /// Decode the embedded parent certificate.
    pub fn justify(&self) -> Result<QuorumCert, CodecError> {
        QuorumCert::decode(non_empty(&self.justify_qc)?).map_err(decode_err)
    }
}

impl ConsensusMessage for ProposalMsg {
    const KIND: MessageKind = MessageKind::Proposal;

    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        basic_encode(self).map_err(encode_err)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        basic_decode(non_empty(bytes)?).map_err(decode_err)
    }
}
